//! Retry controller for transport operations.
//!
//! Wraps an idempotent operation with classified retries and exponential
//! backoff. Cancellation is honored strictly before every attempt and wins
//! against the backoff sleep.

use crate::core::limits::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, MAX_RETRY_DELAY};
use crate::domain::error::{Error, Result};
use crate::infrastructure::metrics::ProviderMetrics;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backoff and attempt-count policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the bound is `max_retries + 1` calls
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
            max_delay: MAX_RETRY_DELAY,
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff delay before the attempt after `attempt` failures.
    ///
    /// `min(max_delay, base_delay * backoff_factor^attempt)` with a
    /// deterministic jitter of `attempt % 10` percent on top.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());
        let jitter = f64::from(attempt % 10) / 100.0;
        Duration::from_secs_f64(capped * (1.0 + jitter))
    }
}

/// Runs transport operations under the retry policy.
pub struct RetryController {
    policy: RetryPolicy,
    metrics: Arc<ProviderMetrics>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, metrics: Arc<ProviderMetrics>) -> Self {
        Self { policy, metrics }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempt `op` up to `max_retries + 1` times.
    ///
    /// Non-retryable errors return immediately; exhaustion wraps the last
    /// error in [`Error::RetryExhausted`].
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_retries + 1;
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::cancelled(operation));
            }

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempts += 1;
            self.metrics.record_error(&err);

            if !err.is_retryable() {
                return Err(err);
            }
            if attempts >= max_attempts {
                warn!(operation, attempts, "retries exhausted");
                return Err(Error::RetryExhausted {
                    operation: operation.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }

            self.metrics.increment_retry_attempts();
            let delay = self.policy.delay_for(attempts - 1);
            debug!(
                operation,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient failure"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return Err(Error::cancelled(operation));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn controller() -> RetryController {
        RetryController::new(RetryPolicy::default(), Arc::new(ProviderMetrics::new()))
    }

    #[test]
    fn delay_grows_exponentially_with_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        // 2s with 1% jitter
        assert_eq!(policy.delay_for(1), Duration::from_millis(2020));
        // 4s with 2% jitter
        assert_eq!(policy.delay_for(2), Duration::from_millis(4080));
    }

    #[test]
    fn delay_is_capped_before_jitter() {
        let policy = RetryPolicy::default();
        // 2^6 = 64s exceeds the 30s cap; 6% jitter applies to the cap.
        assert_eq!(policy.delay_for(6), Duration::from_millis(31_800));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let controller = controller();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result = controller
            .run(&cancel, "list refs", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(Error::git("connection timeout"))
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let controller = controller();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<()> = controller
            .run(&cancel, "clone", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::git("authentication failed")) }
            })
            .await;

        assert!(matches!(result, Err(Error::Git { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_wraps_the_last_error() {
        let controller = controller();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<()> = controller
            .run(&cancel, "clone", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::git("connection refused")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(Error::RetryExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, Error::Git { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_against_the_backoff_sleep() {
        let controller = controller();
        let cancel = CancellationToken::new();
        let cancel_after_first = cancel.clone();
        let calls = AtomicU32::new(0);

        let result: Result<()> = controller
            .run(&cancel, "clone", || {
                calls.fetch_add(1, Ordering::SeqCst);
                cancel_after_first.cancel();
                async { Err(Error::git("connection refused")) }
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_prevents_any_attempt() {
        let controller = controller();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<()> = controller
            .run(&cancel, "clone", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
