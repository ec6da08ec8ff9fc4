// ABOUTME: Bounded exponential backoff for transient provider failures.
// ABOUTME: Deterministic errors are returned immediately without retrying.

use std::future::Future;
use std::time::Duration;

use super::ProviderError;

/// Default number of attempts for a provider call.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Base backoff duration for retries.
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Maximum backoff duration.
const BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Retry policy for provider calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base: BACKOFF_BASE,
            max: BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Run `call` until it succeeds, fails deterministically, or the attempts
    /// are used up. The last transient error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.attempts.max(1);
        let mut backoff = self.base;
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!(
                        "{} failed transiently (attempt {}/{}): {}",
                        operation,
                        attempt,
                        attempts,
                        e
                    );
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    backoff = (backoff * 2).min(self.max);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
