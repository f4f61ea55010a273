//! Exponential backoff with jitter around collaborator calls.
//!
//! Only errors for which [`SyncError::is_retryable`] holds are retried.
//! Everything else (auth, validation, ordering) fails immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::SyncError;

/// Retry settings shared by the fetcher, emitter and initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay, before jitter.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Relative jitter, e.g. `0.3` for ±30 %.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.3,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (zero-based), without jitter.
    #[must_use]
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_ms = self.base_delay.as_secs_f64() * 1_000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1_000.0;
        let ms = (base_ms * self.multiplier.max(1.0).powi(exponent)).min(max_ms);
        Duration::from_secs_f64(ms.max(0.0) / 1_000.0)
    }

    /// Delay before the retry that follows failed attempt `attempt`, with
    /// jitter applied.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt).as_secs_f64();
        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 || base == 0.0 {
            return Duration::from_secs_f64(base);
        }
        let factor = rand::rng().random_range(-jitter..=jitter);
        Duration::from_secs_f64((base * (1.0 + factor)).max(0.0))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last retryable error
    /// once `max_attempts` is reached.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::error!(
                            operation,
                            attempts = max_attempts,
                            error = %err,
                            "retries exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
