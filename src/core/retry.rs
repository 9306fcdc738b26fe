//! Bounded retry with exponential backoff for remote provider calls.
//!
//! Only failures that report themselves as transient (timeouts, connection
//! errors, 5xx, rate limiting) are retried. Permanent failures return on the
//! first attempt.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Classifies an error for the retry loop.
pub trait Transient {
    /// Whether another attempt may succeed.
    fn is_transient(&self) -> bool;
}

/// Retry policy for remote calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    /// Default: 3
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds).
    /// Default: 500ms
    pub initial_delay_ms: u64,

    /// Upper bound for a single delay (milliseconds).
    /// Default: 8000ms
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    /// Default: 2.0
    pub backoff_multiplier: f32,

    /// Whether to add up to 25% jitter to each delay.
    /// Default: true
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), in milliseconds.
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier.max(1.0) as f64;

        // Exponential backoff: base_delay * multiplier^(attempt-1)
        let delay = base_delay * multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = delay.min(self.max_delay_ms as f64);

        if self.jitter {
            (delay + jitter(delay * 0.25)) as u64
        } else {
            delay as u64
        }
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is exhausted. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.should_retry(attempt) => {
                    let delay = self.calculate_delay(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Non-negative jitter in `[0, range)` derived from the clock.
fn jitter(range: f64) -> f64 {
    use std::time::SystemTime;
    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let random = ((seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)) >> 33)
        as f64;
    let normalized = random / (1u64 << 31) as f64;
    normalized.fract() * range
}
