//! Retry/backoff controller
//!
//! Wraps one URL's fetch attempts with bounded retries and linear backoff.
//! Retry state lives in the call, so a failing host never throttles others.

use crate::FetchError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry limits for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,

    /// Backoff base; the wait after attempt `n` is `base_delay * n`
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// The final result of a retried call and how many attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, FetchError>,
    pub attempts: u32,
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or
/// `policy.max_retries` retries are used up
///
/// `call` receives the 1-based attempt number. Backoff sleeps are cut short by
/// `cancel`, which ends the loop with `FetchError::Cancelled`.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        if cancel.is_cancelled() {
            return Attempted {
                result: Err(FetchError::Cancelled),
                attempts: attempt - 1,
            };
        }

        let error = match call(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) => e,
        };

        if !error.is_retryable() || attempt > policy.max_retries {
            return Attempted {
                result: Err(error),
                attempts: attempt,
            };
        }

        let delay = policy.delay_after(attempt);
        tracing::debug!(
            "Attempt {} failed ({}), retrying in {:?}",
            attempt,
            error,
            delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Attempted {
                    result: Err(FetchError::Cancelled),
                    attempts: attempt,
                };
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
