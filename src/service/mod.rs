//! The acquisition orchestrator.
//!
//! ```text
//! request ─► SuccessCache hit? ──────────────────────────► segments
//!              │ miss
//!              ▼
//!            FailureCache live? ─────────────────────────► Throttled(remaining)
//!              │ no
//!              ▼
//!            force_stt? ─► STT ─► segments | SttDisabled | SttFailed
//!              │ no
//!              ▼
//!            selector ─► segments ─► cache ──────────────► segments
//!              │ nothing (300s) / listing error (120s)
//!              ▼
//!            STT (if allowed) ─► segments ─► cache ──────► segments
//!              │ nothing
//!              ▼
//!            FailureCache.set(cooldown) ─────────────────► Throttled(cooldown)
//! ```

mod builder;

pub use builder::{Skald, SkaldBuilder};

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheConfig, FailureCache, SuccessCache};
use crate::source::TranscriptSourceSelector;
use crate::stt::SttFallbackCoordinator;
use crate::telemetry;
use crate::types::{TrackDescriptor, TranscriptRequest, TranscriptSegment};
use crate::{Result, SkaldError};

/// Transcript acquisition with caching, circuit breaking and STT fallback.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and the
/// caches are safe for concurrent use. Two concurrent requests for the same
/// key may both run the full cascade.
pub struct TranscriptService {
    selector: TranscriptSourceSelector,
    stt: Option<SttFallbackCoordinator>,
    success: SuccessCache,
    failure: FailureCache,
    cache_config: CacheConfig,
}

impl TranscriptService {
    /// Fetch a transcript.
    ///
    /// # Errors
    ///
    /// - [`SkaldError::Throttled`] when the breaker is open for this request
    ///   or when neither captions nor STT produced anything.
    /// - [`SkaldError::SttDisabled`] / [`SkaldError::SttFailed`] for forced STT.
    #[instrument(skip(self, request), fields(
        video_id = %request.key.video_id,
        lang = %request.key.language,
        disable_translate = request.key.disable_translate,
    ))]
    pub async fn fetch(&self, request: &TranscriptRequest) -> Result<Vec<TranscriptSegment>> {
        let start = Instant::now();
        let result = self.acquire(request).await;
        record_request(&result, start);
        result
    }

    async fn acquire(&self, request: &TranscriptRequest) -> Result<Vec<TranscriptSegment>> {
        let key = &request.key;

        if let Some(segments) = self.success.get(key) {
            debug!("success cache hit");
            return Ok(segments);
        }

        if let Some(remaining) = self.failure.remaining(key) {
            debug!(remaining, "circuit open");
            metrics::counter!(telemetry::CIRCUIT_OPEN_TOTAL).increment(1);
            return Err(SkaldError::Throttled {
                retry_after_secs: remaining,
            });
        }

        if request.force_stt {
            return self.forced_stt(request).await;
        }

        let cooldown = match self.selector.select(key).await {
            Ok(Some(segments)) if !segments.is_empty() => {
                self.success.set(key.clone(), segments.clone());
                return Ok(segments);
            }
            Ok(_) => {
                debug!("no caption transcript found");
                self.cache_config.failure_cooldown
            }
            Err(e) => {
                debug!(error = %e, "caption source raised an error");
                self.cache_config.upstream_error_cooldown
            }
        };

        if let Some(segments) = self.fallback_stt(request).await {
            self.success.set(key.clone(), segments.clone());
            return Ok(segments);
        }

        warn!(cooldown_secs = cooldown.as_secs(), "transcript unavailable; opening circuit");
        self.failure.set(key.clone(), cooldown);
        Err(SkaldError::Throttled {
            retry_after_secs: cooldown_secs(cooldown),
        })
    }

    /// STT requested explicitly, bypassing the selector.
    async fn forced_stt(&self, request: &TranscriptRequest) -> Result<Vec<TranscriptSegment>> {
        let stt = self
            .stt
            .as_ref()
            .filter(|stt| stt.is_enabled())
            .ok_or(SkaldError::SttDisabled)?;
        debug!("forced STT");
        let segments = stt.transcribe(request).await.ok_or(SkaldError::SttFailed)?;
        self.success.set(request.key.clone(), segments.clone());
        Ok(segments)
    }

    /// STT after the caption cascade came up empty, when allowed.
    async fn fallback_stt(&self, request: &TranscriptRequest) -> Option<Vec<TranscriptSegment>> {
        if !request.stt_fallback {
            debug!("STT fallback disabled by request");
            return None;
        }
        let stt = self.stt.as_ref()?;
        if !stt.is_enabled() {
            debug!("STT fallback disabled by configuration");
            return None;
        }
        stt.transcribe(request).await
    }

    /// Every caption track of a video, in source order.
    ///
    /// A video without captions yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_languages(&self, video_id: &str) -> Result<Vec<TrackDescriptor>> {
        let source = self.selector.source();
        if !source.supports_listing() {
            return Err(SkaldError::Unsupported);
        }
        match source.list_tracks(video_id).await {
            Ok(tracks) => {
                info!(tracks = tracks.len(), "listed caption tracks");
                Ok(tracks)
            }
            Err(e) if e.is_no_transcript() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn cooldown_secs(cooldown: Duration) -> u64 {
    cooldown.as_secs().max(1)
}

/// Record request outcome metrics (counter + histogram).
fn record_request(result: &Result<Vec<TranscriptSegment>>, start: Instant) {
    let status = match result {
        Ok(_) => "ok",
        Err(SkaldError::Throttled { .. }) => "throttled",
        Err(_) => "error",
    };
    metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => status).increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
}
