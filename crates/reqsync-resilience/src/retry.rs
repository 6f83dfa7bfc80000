//! Retry with exponential backoff
//!
//! The delay before retry `n` (1-based) is `min(max_delay, base_delay * 2^(n-1))`.
//! With `max_retries = 3` an operation runs at most four times.

use crate::error::{RetryError, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the original attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Create policy with default delays
    #[inline]
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Set base delay
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Policy that never retries
    #[inline]
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Delay before retry number `retry` (1-based)
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Total attempts allowed, original included
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// One scheduled retry, reported before the executor sleeps
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Sleep before the next attempt
    pub delay: Duration,
    /// Failure that triggered the retry
    pub error: &'a E,
}

/// Run `operation` until it succeeds, fails permanently or the budget runs out
///
/// # Errors
///
/// [`RetryError::Permanent`] for a non-retryable failure (surfaced immediately),
/// [`RetryError::Exhausted`] after `max_retries` retries all failed.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_observer(policy, operation, |_| {}).await
}

/// [`retry_with_backoff`] with a callback invoked before each sleep
///
/// # Errors
///
/// Same as [`retry_with_backoff`].
pub async fn retry_with_observer<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut operation: F,
    mut observer: O,
) -> Result<T, RetryError<E>>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&RetryAttempt<'_, E>),
{
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!(attempt, error = %err, "non-retryable failure");
                return Err(RetryError::Permanent(err));
            }
            Err(err) if attempt > policy.max_retries => {
                error!(attempts = attempt, error = %err, "retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                let delay = policy.backoff_delay(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying after transient failure"
                );
                observer(&RetryAttempt {
                    attempt,
                    delay,
                    error: &err,
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
