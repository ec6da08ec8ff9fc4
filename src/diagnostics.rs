// ABOUTME: Diagnostics accumulator for non-fatal warnings during a promotion.
// ABOUTME: Collects warnings that shouldn't fail a run but end up in its record.

use serde::{Deserialize, Serialize};

/// Collects non-fatal warnings during a promotion run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The live environment could not be decided from routing.
    pub fn degraded_resolution(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DegradedResolution, message)
    }

    /// A failed smoke test was overridden with `--force`.
    pub fn forced_smoke_failure(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ForcedSmokeFailure, message)
    }

    /// An unhealthy drain check was overridden with `--force`.
    pub fn forced_drain_failure(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ForcedDrainFailure, message)
    }

    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    pub fn history_write(message: impl Into<String>) -> Self {
        Self::new(WarningKind::HistoryWrite, message)
    }

    /// A non-fatal hook exited unsuccessfully.
    pub fn hook_failure(message: impl Into<String>) -> Self {
        Self::new(WarningKind::HookFailure, message)
    }
}

/// Categories of warnings that can occur during a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DegradedResolution,
    ForcedSmokeFailure,
    ForcedDrainFailure,
    /// Failed to release the run lock (lock file may remain).
    LockRelease,
    /// The promotion record could not be appended to the history.
    HistoryWrite,
    HookFailure,
}
