// src/ingest/retry.rs
//! Exponential backoff around a fallible async operation.
//!
//! The executor knows nothing about error types; callers pass a classifier
//! that says which failures are worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use metrics::counter;

use crate::ingest::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Pause before 1-based `attempt`: nothing before the first, then
    /// `base_delay * 2^(attempt - 2)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` calls have been made. The last error is returned
/// as-is; deciding what to do with it is up to the caller.
pub async fn retry_with_backoff<T, E, Op, Fut, C>(
    policy: RetryPolicy,
    label: &str,
    is_transient: C,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        let err = match op().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        if !is_transient(&err) {
            tracing::debug!(
                target: "ingest",
                op = label,
                attempt,
                error = %err,
                "permanent failure, not retrying"
            );
            return Err(err);
        }

        if attempt >= max_attempts {
            tracing::error!(
                target: "ingest",
                op = label,
                attempts = attempt,
                error = %err,
                "all attempts failed, giving up"
            );
            return Err(err);
        }

        let delay = policy.delay_before(attempt + 1);
        tracing::warn!(
            target: "ingest",
            op = label,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying"
        );
        counter!("ingest_retry_attempts_total").increment(1);

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// [`retry_with_backoff`] classified by [`FetchError::is_transient`].
pub async fn retry_transient<T, Op, Fut>(
    policy: RetryPolicy,
    label: &str,
    op: Op,
) -> Result<T, FetchError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    retry_with_backoff(policy, label, FetchError::is_transient, op).await
}
