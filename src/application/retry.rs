//! Retry policy for transient remote faults.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::config::RetryConfig;
use crate::domain::models::operation::OperationError;

/// Fixed-backoff retry policy for `Submit`/`Poll` calls.
///
/// The default policy retries transient faults forever with a one second
/// backoff, so a persistent service outage presents as an infinite hang
/// rather than a surfaced error. Bound `max_attempts` to trade that
/// liveness hazard for fail-fast behavior.
///
/// Permanent errors (malformed-request rejections) are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Fixed delay between attempts
    backoff: Duration,
    /// Total attempts before giving up; `None` retries forever
    max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            backoff: Duration::from_millis(config.backoff_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    pub fn new(backoff: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            backoff,
            max_attempts,
        }
    }

    /// Execute `operation`, absorbing transient errors per this policy.
    ///
    /// Returns the first success, the first permanent error, or the last
    /// transient error once `max_attempts` is spent.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, OperationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !err.is_transient() {
                        debug!(error = %err, "Permanent error, not retrying");
                        return Err(err);
                    }

                    attempt += 1;
                    if let Some(max) = self.max_attempts {
                        if attempt >= max {
                            warn!(attempts = attempt, error = %err, "Retries exhausted");
                            return Err(err);
                        }
                    }

                    warn!(
                        attempt,
                        backoff_ms = self.backoff.as_millis() as u64,
                        error = %err,
                        "Transient fault, retrying after backoff"
                    );
                    sleep(self.backoff).await;
                }
            }
        }
    }
}
