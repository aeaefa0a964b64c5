//! Retry configuration, delay calculation, and the retry executor.
//!
//! [`RetryExecutor`] is the single place that absorbs upstream flakiness.
//! It wraps any zero-argument fetch returning a sequence, treats an empty
//! sequence as a failure, and retries only errors classified as transient
//! by [`SkaldError::is_transient()`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::telemetry;
use crate::{Result, SkaldError};

/// Configuration for retry behaviour on transient errors.
///
/// Exponential backoff plus uniform jitter:
/// `base_delay * 2^attempt + uniform(0, max_jitter)`.
///
/// ```rust
/// # use skald::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .base_delay(Duration::from_millis(200))
///     .max_jitter(Duration::ZERO);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 5.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1.2s.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay. Default: 600ms.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1200),
            max_jitter: Duration::from_millis(600),
        }
    }
}

impl RetryConfig {
    /// Create a new config with the default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the jitter bound. `Duration::ZERO` disables jitter.
    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Calculate the backoff for a given attempt number (0-indexed).
    ///
    /// `base_delay * 2^attempt`. Does NOT include jitter; see
    /// [`jittered_delay()`](Self::jittered_delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Backoff plus a uniform random jitter in `[0, max_jitter]`.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        if self.max_jitter.is_zero() {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=self.max_jitter.as_secs_f64());
        base.saturating_add(Duration::from_secs_f64(jitter))
    }
}

/// Runs fetch-like operations under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `f` until it yields a non-empty sequence.
    ///
    /// An empty result becomes [`SkaldError::EmptyTranscript`]. Transient
    /// errors are retried up to `max_attempts - 1` times; the last error is
    /// returned as is. Permanent errors are returned immediately.
    pub async fn execute<F, Fut, T>(&self, operation: &str, f: F) -> Result<Vec<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let outcome = match f().await {
                Ok(data) if data.is_empty() => Err(SkaldError::EmptyTranscript),
                other => other,
            };
            match outcome {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.config.jittered_delay(attempt);
                    metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
                        .increment(1);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e), // permanent, or out of attempts
            }
        }
    }
}
