//! Retry policy with linear backoff for reasoning service calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::RetryConfig;

/// Retry policy with linear backoff
///
/// After failed attempt `n` (1-based) the policy sleeps `n * backoff` before
/// trying again. No jitter and no circuit breaking, so retry timing is fully
/// deterministic. Permanent errors (see [`DomainError::is_transient`]) are
/// returned immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    attempts: u32,
    /// Backoff unit
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a new retry policy. `attempts` is raised to at least 1.
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let backoff = Duration::try_from_secs_f64(config.backoff_secs.max(0.0)).unwrap_or_default();
        Self::new(config.attempts, backoff)
    }

    /// A policy that tries once and never sleeps.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sleep after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Execute an operation, retrying transient failures.
    ///
    /// # Returns
    /// * `Ok(T)` - Operation succeeded
    /// * `Err(DomainError)` - The last error once attempts are exhausted,
    ///   or the first permanent error
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.attempts,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "attempt failed, retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "operation failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}
