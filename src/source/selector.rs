//! Caption track selection with an ordered fallback chain.
//!
//! [`TranscriptSourceSelector`] lists a video's tracks once, then evaluates
//! its tiers in priority order until one yields a non-empty transcript.
//!
//! # Tier order
//!
//! ```text
//!  list_tracks(video) ──► NoTranscripts / disabled ──► None (terminal)
//!        │
//!        ▼
//!  1 manual_exact     preferred languages, human tracks
//!  2 translate        translatable tracks → target (degrade to original)
//!  3 generated_exact  preferred languages, generated tracks
//!  4 auto             only for lang=auto: any manual, then any generated
//!  5 last_resort      every track, enumeration order
//!  6 direct           source.direct_fetch(preferred)
//! ```
//!
//! Sources without listing support skip straight to direct fetches with
//! `preferred`, then `["en"]`, `["en-US"]`, `["en-GB"]`.
//!
//! Per-track fetches go through the [`RetryExecutor`]; a failure in one tier
//! never prevents the next from running.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::CaptionSource;
use super::tiers::{AutoLanguage, DirectFallback, ExactLanguage, LastResort, Translate};
use crate::retry::RetryExecutor;
use crate::telemetry;
use crate::types::{RequestKey, TrackDescriptor, TranscriptSegment};
use crate::Result;

/// Everything a tier needs for one selection run.
pub struct SelectionContext<'a> {
    pub key: &'a RequestKey,
    /// `[requested, "en", "en-US", "en-GB"]`.
    pub preferred: Vec<String>,
    /// Tracks in the source's enumeration order.
    pub tracks: Vec<TrackDescriptor>,
    pub source: &'a dyn CaptionSource,
    pub retry: &'a RetryExecutor,
}

impl SelectionContext<'_> {
    /// Fetch one track under the retry policy.
    pub async fn fetch(
        &self,
        track: &TrackDescriptor,
        operation: &str,
    ) -> Result<Vec<TranscriptSegment>> {
        self.retry
            .execute(operation, || self.source.fetch(track))
            .await
    }
}

/// One stage of the fallback chain.
#[async_trait]
pub trait SelectionTier: Send + Sync {
    /// Tier name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Try to produce a transcript; `None` hands over to the next tier.
    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>>;
}

/// Evaluate `tiers` in order and return the first non-empty result with the
/// name of the tier that produced it.
pub async fn first_success(
    tiers: &[Box<dyn SelectionTier>],
    ctx: &SelectionContext<'_>,
) -> Option<(&'static str, Vec<TranscriptSegment>)> {
    for tier in tiers {
        match tier.attempt(ctx).await {
            Some(segments) if !segments.is_empty() => return Some((tier.name(), segments)),
            _ => debug!(tier = tier.name(), "tier produced nothing"),
        }
    }
    None
}

/// The six built-in tiers in priority order.
pub fn default_tiers() -> Vec<Box<dyn SelectionTier>> {
    vec![
        Box::new(ExactLanguage::manual()),
        Box::new(Translate),
        Box::new(ExactLanguage::generated()),
        Box::new(AutoLanguage),
        Box::new(LastResort),
        Box::new(DirectFallback),
    ]
}

/// Picks and fetches the best available caption track for a request.
pub struct TranscriptSourceSelector {
    source: Arc<dyn CaptionSource>,
    retry: RetryExecutor,
    tiers: Vec<Box<dyn SelectionTier>>,
}

impl TranscriptSourceSelector {
    /// Selector with the default tier chain.
    pub fn new(source: Arc<dyn CaptionSource>, retry: RetryExecutor) -> Self {
        Self::with_tiers(source, retry, default_tiers())
    }

    /// Selector with a custom tier chain.
    pub fn with_tiers(
        source: Arc<dyn CaptionSource>,
        retry: RetryExecutor,
        tiers: Vec<Box<dyn SelectionTier>>,
    ) -> Self {
        Self {
            source,
            retry,
            tiers,
        }
    }

    pub fn source(&self) -> &Arc<dyn CaptionSource> {
        &self.source
    }

    /// Run the chain for `key`.
    ///
    /// `Ok(None)` means no caption transcript could be obtained (including
    /// videos with no captions at all). `Err` means listing itself failed
    /// for a reason other than "no transcripts".
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn select(&self, key: &RequestKey) -> Result<Option<Vec<TranscriptSegment>>> {
        let preferred = key.preferred_languages();
        debug!(?preferred, disable_translate = key.disable_translate, "selecting transcript");

        if !self.source.supports_listing() {
            return Ok(self.select_without_listing(key, &preferred).await);
        }

        let tracks = match self.source.list_tracks(&key.video_id).await {
            Ok(tracks) => tracks,
            Err(e) if e.is_no_transcript() => {
                debug!(error = %e, "no transcripts available");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "listing tracks failed");
                return Err(e);
            }
        };
        debug!(
            available = ?tracks.iter().map(TrackDescriptor::label).collect::<Vec<_>>(),
            "available transcripts"
        );

        let ctx = SelectionContext {
            key,
            preferred,
            tracks,
            source: self.source.as_ref(),
            retry: &self.retry,
        };
        let selected = first_success(&self.tiers, &ctx).await;
        Ok(selected.map(|(tier, segments)| {
            metrics::counter!(telemetry::TIER_HITS_TOTAL, "tier" => tier).increment(1);
            debug!(tier, segments = segments.len(), "transcript selected");
            segments
        }))
    }

    async fn select_without_listing(
        &self,
        key: &RequestKey,
        preferred: &[String],
    ) -> Option<Vec<TranscriptSegment>> {
        let candidates = [
            preferred.to_vec(),
            vec!["en".to_string()],
            vec!["en-US".to_string()],
            vec!["en-GB".to_string()],
        ];
        for languages in &candidates {
            match self.source.direct_fetch(&key.video_id, languages).await {
                Ok(segments) if !segments.is_empty() => {
                    metrics::counter!(telemetry::TIER_HITS_TOTAL, "tier" => "direct").increment(1);
                    return Some(segments);
                }
                Ok(_) => debug!(?languages, "direct fetch returned nothing"),
                Err(e) => debug!(?languages, error = %e, "direct fetch failed"),
            }
        }
        None
    }
}
