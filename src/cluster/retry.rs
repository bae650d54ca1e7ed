//! Retry with exponential backoff for idempotent cluster reads
//!
//! Listing tasks, apps, or hosts is safe to repeat, so a transient failure
//! (connection refused, timeout, 5xx) is retried a few times before the tick
//! gives up. Kill calls are never retried: a failed kill skips the tick.

use crate::error::{Result, TurmoilError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration
///
/// # Fields
///
/// * `max_attempts` - Maximum number of attempts, including the first (default: 3)
/// * `base_delay` - Delay before the first retry (default: 200ms)
/// * `max_delay` - Cap on any single delay (default: 5s)
/// * `jitter` - Random variation factor (default: 0.1 = 10%)
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries
    pub fn disabled() -> Self {
        Self::default().max_attempts(1)
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter factor, clamped to `[0, 1]`
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-based):
    /// `base_delay * 2^attempt`, varied by +/- jitter, capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.min(16) as u32;
        let exponential = self.base_delay.saturating_mul(2_u32.pow(exponent));

        let spread = (rand::random::<f64>() * 2.0 - 1.0) * self.jitter;
        let jittered = exponential.mul_f64((1.0 + spread).max(0.0));

        jittered.min(self.max_delay)
    }

    /// Whether an error is transient and worth another attempt
    pub fn should_retry_error(&self, error: &TurmoilError) -> bool {
        match error {
            TurmoilError::Timeout(_) => true,
            TurmoilError::ClientCommunication(message) => {
                let message = message.to_lowercase();
                if message.contains("unauthorized") || message.contains("forbidden") {
                    return false;
                }
                message.contains("temporary")
                    || message.contains("connection")
                    || message.contains("timed out")
                    || message.contains("timeout")
            }
            TurmoilError::EmptyPopulation | TurmoilError::Configuration(_) => false,
        }
    }
}

/// Retry an operation with exponential backoff.
///
/// Only errors accepted by [`RetryConfig::should_retry_error`] are retried;
/// anything else is returned immediately.
pub async fn retry_with_backoff<F, T, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempt = attempt + 1, "Cluster request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt + 1 < config.max_attempts && config.should_retry_error(&e) => {
                let delay = config.calculate_delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    error = %e,
                    "Cluster request failed, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if an HTTP status code is transient
///
/// Retryable: 408, 429, and 5xx except 501 and 505.
pub fn should_retry_status(status: u16) -> bool {
    match status {
        408 | 429 => true,
        500..=599 => status != 501 && status != 505,
        _ => false,
    }
}
