//! Retry Logic
//!
//! Exponential backoff retry for provider calls. Only errors the caller
//! classifies as retryable (rate-limit responses) are retried; every other
//! error is returned immediately.

use fmcat_common::config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Backoff before retrying after the given (1-based) failed attempt
///
/// Doubles from `base_delay_ms`, capped at `max_delay_ms`: 1s, 2s, 4s, ... 30s.
pub fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay_ms = policy
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(policy.max_delay_ms);
    Duration::from_millis(delay_ms)
}

/// Retry an async operation with exponential backoff.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If the error is retryable and attempts remain: log WARN, back off, retry
/// 4. Otherwise return the error (no retry)
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., provider id)
/// * `policy` - Attempt count and delay bounds
/// * `is_retryable` - Classifies errors eligible for backoff
/// * `operation` - Async closure performing one attempt
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    operation_name: &str,
    policy: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_attempts {
                    return Err(err);
                }

                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
