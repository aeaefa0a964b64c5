//! Caching subsystem.
//!
//! Two caches share one request fingerprint ([`RequestKey`](crate::RequestKey)):
//!
//! - [`SuccessCache`]: transcripts that were acquired, valid for a fixed TTL
//!   (30 minutes by default).
//!
//! - [`FailureCache`]: the circuit breaker. After an acquisition fails, the
//!   key is put on cooldown so immediate retries short-circuit instead of
//!   re-running the whole fallback cascade. The cooldown length is chosen by
//!   the failure cause.
//!
//! Both are moka-backed (bounded, safe for concurrent access) but apply
//! their TTLs lazily against an injected [`Clock`] rather than moka's own
//! timer, so expiry is deterministic under test. Nothing is persisted.

mod clock;
mod failure;
mod success;

pub use clock::{Clock, ManualClock, SystemClock};
pub use failure::FailureCache;
pub use success::SuccessCache;

use std::time::Duration;

/// Configuration for both caches.
///
/// ```rust
/// # use skald::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(2_000)
///     .success_ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries per cache. Default: 10,000.
    pub max_entries: u64,
    /// How long a stored transcript stays valid. Default: 30 minutes.
    pub success_ttl: Duration,
    /// Cooldown after finding no data anywhere. Default: 5 minutes.
    pub failure_cooldown: Duration,
    /// Cooldown after the caption source raised an error. Default: 2 minutes.
    pub upstream_error_cooldown: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            success_ttl: Duration::from_secs(30 * 60),
            failure_cooldown: Duration::from_secs(5 * 60),
            upstream_error_cooldown: Duration::from_secs(2 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries per cache.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the transcript TTL.
    pub fn success_ttl(mut self, ttl: Duration) -> Self {
        self.success_ttl = ttl;
        self
    }

    /// Set the cooldown used when nothing could be obtained.
    pub fn failure_cooldown(mut self, cooldown: Duration) -> Self {
        self.failure_cooldown = cooldown;
        self
    }

    /// Set the cooldown used after an upstream error.
    pub fn upstream_error_cooldown(mut self, cooldown: Duration) -> Self {
        self.upstream_error_cooldown = cooldown;
        self
    }
}
