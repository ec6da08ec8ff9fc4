// ABOUTME: Error types for promotion runs.
// ABOUTME: Covers resolution, routing, health, provider, lock and history failures.

use chrono::{DateTime, Utc};

use crate::provider::ProviderError;
use crate::resolve::ResolveError;
use crate::routing::RoutingError;
use crate::types::AppName;

use super::record::Stage;

/// Errors that can end a promotion run.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    /// A required resource does not exist.
    #[error("required resource not found: {0}")]
    ResourceNotFound(&'static str),

    /// A listener mutation failed.
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),

    /// Health did not converge within the stage's budget.
    #[error("{stage} health check did not pass after {attempts} attempt(s)")]
    HealthCheckTimeout { stage: Stage, attempts: u32 },

    /// A provider call kept failing transiently after retries.
    #[error("provider unavailable: {0}")]
    ProviderTransient(#[source] ProviderError),

    /// The provider rejected a call.
    #[error(transparent)]
    Provider(ProviderError),

    /// Task definition or service update failed.
    #[error("deploy failed: {0}")]
    Deploy(String),

    /// Another run holds the application's lock.
    #[error("promotion lock held by {holder} (pid {pid}) since {started_at}")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    /// The lock could not be taken or inspected.
    #[error("lock error: {0}")]
    Lock(String),

    /// Rollback needs a succeeded promotion with a known previous image.
    #[error("no previous successful promotion of {0} to roll back to")]
    NoPreviousPromotion(AppName),

    #[error("promotion history error: {0}")]
    History(String),
}

/// Error categories for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionErrorKind {
    ResourceNotFound,
    Routing,
    HealthCheckTimeout,
    ProviderTransient,
    Provider,
    Deploy,
    Lock,
    NoPreviousPromotion,
    History,
}

impl PromotionError {
    pub fn kind(&self) -> PromotionErrorKind {
        match self {
            PromotionError::ResourceNotFound(_) => PromotionErrorKind::ResourceNotFound,
            PromotionError::Routing(_) => PromotionErrorKind::Routing,
            PromotionError::HealthCheckTimeout { .. } => PromotionErrorKind::HealthCheckTimeout,
            PromotionError::ProviderTransient(_) => PromotionErrorKind::ProviderTransient,
            PromotionError::Provider(_) => PromotionErrorKind::Provider,
            PromotionError::Deploy(_) => PromotionErrorKind::Deploy,
            PromotionError::LockHeld { .. } | PromotionError::Lock(_) => PromotionErrorKind::Lock,
            PromotionError::NoPreviousPromotion(_) => PromotionErrorKind::NoPreviousPromotion,
            PromotionError::History(_) => PromotionErrorKind::History,
        }
    }

    pub fn lock_held(holder: String, pid: u32, started_at: DateTime<Utc>) -> Self {
        PromotionError::LockHeld {
            holder,
            pid,
            started_at,
        }
    }

    pub fn lock_error(message: impl Into<String>) -> Self {
        PromotionError::Lock(message.into())
    }

    /// Provider failure during task or service work. Transient failures
    /// keep their category; anything else is a deploy failure.
    pub(crate) fn deploy(operation: &str) -> impl FnOnce(ProviderError) -> Self {
        move |err| {
            if err.is_transient() {
                PromotionError::ProviderTransient(err)
            } else {
                PromotionError::Deploy(format!("{operation}: {err}"))
            }
        }
    }
}

impl From<ProviderError> for PromotionError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            PromotionError::ProviderTransient(err)
        } else {
            PromotionError::Provider(err)
        }
    }
}

impl From<ResolveError> for PromotionError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::ResourceNotFound(what) => PromotionError::ResourceNotFound(what),
            ResolveError::Provider(source) => source.into(),
        }
    }
}
