//! Cache of successfully acquired transcripts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::ops::compute::Op;
use moka::sync::Cache;
use tracing::debug;

use super::{CacheConfig, Clock};
use crate::telemetry;
use crate::types::{RequestKey, TranscriptSegment};

#[derive(Clone)]
struct SuccessEntry {
    stored_at: Instant,
    segments: Arc<Vec<TranscriptSegment>>,
}

/// Transcripts keyed by [`RequestKey`], valid for `success_ttl` after storage.
///
/// Expiry is lazy: an expired entry is dropped by the `get` that observes it.
pub struct SuccessCache {
    entries: Cache<RequestKey, SuccessEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SuccessCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(config.max_entries).build(),
            ttl: config.success_ttl,
            clock,
        }
    }

    /// Look up a transcript, evicting it if its TTL has passed.
    pub fn get(&self, key: &RequestKey) -> Option<Vec<TranscriptSegment>> {
        let hit = self.entries.get(key).and_then(|entry| {
            let age = self.clock.now().saturating_duration_since(entry.stored_at);
            if age > self.ttl {
                debug!(%key, age_secs = age.as_secs(), "success cache entry expired");
                self.evict_if_unchanged(key, &entry);
                None
            } else {
                Some(entry.segments.as_ref().clone())
            }
        });
        record_lookup(hit.is_some());
        hit
    }

    /// Store (or overwrite) a transcript.
    pub fn set(&self, key: RequestKey, segments: Vec<TranscriptSegment>) {
        self.entries.insert(
            key,
            SuccessEntry {
                stored_at: self.clock.now(),
                segments: Arc::new(segments),
            },
        );
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove `key` only while it still holds `expired`; a concurrent `set`
    /// landing after the lookup survives.
    fn evict_if_unchanged(&self, key: &RequestKey, expired: &SuccessEntry) {
        self.entries
            .entry_by_ref(key)
            .and_compute_with(|current| match current {
                Some(current) if Arc::ptr_eq(&current.value().segments, &expired.segments) => {
                    Op::Remove
                }
                _ => Op::Nop,
            });
    }
}

fn record_lookup(hit: bool) {
    if hit {
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => "success").increment(1);
    } else {
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => "success").increment(1);
    }
}
