//! Builder for configuring service instances

use std::sync::Arc;

use super::TranscriptService;
use crate::cache::{CacheConfig, Clock, FailureCache, SuccessCache, SystemClock};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::source::{CaptionSource, SelectionTier, TranscriptSourceSelector, default_tiers};
use crate::stt::SttFallbackCoordinator;
use crate::{Result, SkaldError};

/// Main entry point for creating service instances.
pub struct Skald;

impl Skald {
    /// Create a new builder for configuring the service.
    pub fn builder() -> SkaldBuilder {
        SkaldBuilder::new()
    }
}

/// Builder for configuring service instances.
pub struct SkaldBuilder {
    source: Option<Arc<dyn CaptionSource>>,
    tiers: Option<Vec<Box<dyn SelectionTier>>>,
    stt: Option<SttFallbackCoordinator>,
    retry: RetryConfig,
    cache: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl Default for SkaldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SkaldBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            tiers: None,
            stt: None,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Caption source to select tracks from (required).
    pub fn caption_source(mut self, source: Arc<dyn CaptionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the default selection tiers.
    pub fn tiers(mut self, tiers: Vec<Box<dyn SelectionTier>>) -> Self {
        self.tiers = Some(tiers);
        self
    }

    /// Enable speech-to-text fallback. `ENABLE_STT` is read from the
    /// coordinator's runtime configuration.
    pub fn stt(mut self, coordinator: SttFallbackCoordinator) -> Self {
        self.stt = Some(coordinator);
        self
    }

    /// Configure retry behaviour for caption fetches.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Configure cache sizes and lifetimes.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Time source for cache expiry (default: system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<TranscriptService> {
        let source = self.source.ok_or_else(|| {
            SkaldError::Configuration("a caption source must be configured".to_string())
        })?;
        let retry = RetryExecutor::new(self.retry);
        let tiers = self.tiers.unwrap_or_else(default_tiers);
        let selector = TranscriptSourceSelector::with_tiers(source, retry, tiers);

        Ok(TranscriptService {
            selector,
            stt: self.stt,
            success: SuccessCache::new(&self.cache, self.clock.clone()),
            failure: FailureCache::new(&self.cache, self.clock),
            cache_config: self.cache,
        })
    }
}
