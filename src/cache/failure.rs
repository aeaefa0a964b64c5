//! Circuit breaker: per-request cooldowns after failed acquisitions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::ops::compute::Op;
use moka::sync::Cache;
use tracing::debug;

use super::{CacheConfig, Clock};
use crate::telemetry;
use crate::types::RequestKey;

#[derive(Clone, Copy, PartialEq, Eq)]
struct FailureEntry {
    stored_at: Instant,
    cooldown: Duration,
}

/// Cooldown records keyed by [`RequestKey`].
///
/// The cooldown is chosen per cause by the caller. While a record is live,
/// [`remaining`](Self::remaining) reports whole seconds left, never below 1.
pub struct FailureCache {
    entries: Cache<RequestKey, FailureEntry>,
    default_cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl FailureCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(config.max_entries).build(),
            default_cooldown: config.failure_cooldown,
            clock,
        }
    }

    /// Seconds left on the cooldown for `key`, evicting it once elapsed.
    pub fn remaining(&self, key: &RequestKey) -> Option<u64> {
        let remaining = self.entries.get(key).and_then(|entry| {
            let elapsed = self.clock.now().saturating_duration_since(entry.stored_at);
            if elapsed > entry.cooldown {
                debug!(%key, "cooldown elapsed");
                self.close_if_unchanged(key, entry);
                None
            } else {
                Some((entry.cooldown - elapsed).as_secs().max(1))
            }
        });
        if remaining.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => "failure").increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => "failure").increment(1);
        }
        remaining
    }

    /// Open the breaker for `key` for `cooldown`. A zero cooldown means the default.
    pub fn set(&self, key: RequestKey, cooldown: Duration) {
        let cooldown = if cooldown.is_zero() {
            self.default_cooldown
        } else {
            cooldown
        };
        self.entries.insert(
            key,
            FailureEntry {
                stored_at: self.clock.now(),
                cooldown,
            },
        );
    }

    /// Open the breaker with the default cooldown.
    pub fn set_default(&self, key: RequestKey) {
        self.set(key, self.default_cooldown);
    }

    pub fn default_cooldown(&self) -> Duration {
        self.default_cooldown
    }

    /// Remove `key` only while it still holds `elapsed`, so a breaker opened
    /// concurrently after the lookup stays open.
    fn close_if_unchanged(&self, key: &RequestKey, elapsed: FailureEntry) {
        self.entries
            .entry_by_ref(key)
            .and_compute_with(|current| match current {
                Some(current) if *current.value() == elapsed => Op::Remove,
                _ => Op::Nop,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock() -> (FailureCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (FailureCache::new(&CacheConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn remaining_counts_down() {
        let (cache, clock) = cache_with_clock();
        let key = RequestKey::new("v1", "en");
        cache.set(key.clone(), Duration::from_secs(120));

        assert_eq!(cache.remaining(&key), Some(120));
        clock.advance(Duration::from_millis(30_500));
        assert_eq!(cache.remaining(&key), Some(89));
    }

    #[test]
    fn floors_at_one_second() {
        let (cache, clock) = cache_with_clock();
        let key = RequestKey::new("v1", "en");
        cache.set(key.clone(), Duration::from_secs(10));

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.remaining(&key), Some(1));
        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.remaining(&key), None);
    }

    #[test]
    fn zero_cooldown_uses_default() {
        let (cache, _clock) = cache_with_clock();
        let key = RequestKey::new("v1", "en");
        cache.set(key.clone(), Duration::ZERO);
        assert_eq!(cache.remaining(&key), Some(300));
    }

    #[test]
    fn unknown_key_is_closed() {
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.remaining(&RequestKey::new("nope", "en")), None);
    }
}
