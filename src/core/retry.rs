//! Retry utility for handling transient errors in async operations
//!
//! Provides configurable retry policies with exponential backoff. Only errors
//! that report themselves as retryable are attempted again; everything else is
//! returned to the caller after the first failure.

use crate::core::error::ScannerError;
use std::time::Duration;
use tokio::time::sleep;

/// Configurable retry policy for async operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (0-based)
    ///
    /// `min(base * 2^attempt, max)` with exponential backoff, `base` otherwise.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        if !self.exponential {
            return self.base_delay.min(self.max_delay);
        }
        let factor = 2u32.saturating_pow(attempt.min(31) as u32);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ScannerError {
    fn is_retryable(&self) -> bool {
        ScannerError::is_retryable(self)
    }
}

/// Execute an async operation with retry logic for transient errors
///
/// # Examples
/// ```rust
/// use todoscan::core::retry::{retry_async, RetryPolicy};
/// use todoscan::core::error::ScannerError;
///
/// # async fn example() -> Result<String, ScannerError> {
/// let result = retry_async("clone", &RetryPolicy::default(), || async {
///     Ok::<String, ScannerError>("success".to_string())
/// })
/// .await?;
/// # Ok(result)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                attempt += 1;
                if !error.is_retryable() {
                    return Err(error);
                }
                if attempt >= max_attempts {
                    log::warn!(
                        "Operation '{}' failed after {} attempts: {}",
                        operation_name,
                        attempt,
                        error
                    );
                    return Err(error);
                }
                let delay = policy.delay_for(attempt - 1);
                log::debug!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    max_attempts,
                    delay,
                    error
                );
                sleep(delay).await;
            }
        }
    }
}
