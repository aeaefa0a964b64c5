//! Backend selection and the per-backend transcription pipelines.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::traits::{AudioChunks, AudioDownloader, AudioSegmenter, DurationProber, SpeechToText};
use crate::config::RuntimeConfig;
use crate::normalize::normalize_durations;
use crate::telemetry;
use crate::types::{SttBackendChoice, TranscriptRequest, TranscriptSegment};

/// Drives audio acquisition and transcription when captions are unavailable.
///
/// Never fails: every error along a path is logged and collapses into
/// `None`. Temporary audio is dropped (and deleted) before returning.
pub struct SttFallbackCoordinator {
    runtime: Arc<RuntimeConfig>,
    downloader: Arc<dyn AudioDownloader>,
    segmenter: Arc<dyn AudioSegmenter>,
    prober: Arc<dyn DurationProber>,
    openai: Option<Arc<dyn SpeechToText>>,
    gemini: Option<Arc<dyn SpeechToText>>,
}

impl SttFallbackCoordinator {
    /// Coordinator without backends; add them with
    /// [`openai`](Self::openai) and [`gemini`](Self::gemini).
    pub fn new(
        runtime: Arc<RuntimeConfig>,
        downloader: Arc<dyn AudioDownloader>,
        segmenter: Arc<dyn AudioSegmenter>,
        prober: Arc<dyn DurationProber>,
    ) -> Self {
        Self {
            runtime,
            downloader,
            segmenter,
            prober,
            openai: None,
            gemini: None,
        }
    }

    pub fn openai(mut self, backend: Arc<dyn SpeechToText>) -> Self {
        self.openai = Some(backend);
        self
    }

    pub fn gemini(mut self, backend: Arc<dyn SpeechToText>) -> Self {
        self.gemini = Some(backend);
        self
    }

    /// `ENABLE_STT` as currently configured.
    pub fn is_enabled(&self) -> bool {
        self.runtime.snapshot().enable_stt
    }

    /// Resolve the backend: request override, then `STT_BACKEND`.
    ///
    /// Returns `None` for unrecognised names.
    pub fn resolve_backend(&self, requested: Option<&str>) -> Option<SttBackendChoice> {
        let name = requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.runtime.snapshot().stt_backend);
        match name.parse() {
            Ok(choice) => Some(choice),
            Err(_) => {
                warn!(backend = %name, "unknown STT backend, skipping");
                None
            }
        }
    }

    /// Transcribe the request's video with the resolved backend.
    ///
    /// Does not consult `ENABLE_STT`; callers gate on [`is_enabled`](Self::is_enabled).
    #[instrument(skip(self, request), fields(video_id = %request.key.video_id))]
    pub async fn transcribe(&self, request: &TranscriptRequest) -> Option<Vec<TranscriptSegment>> {
        let backend = self.resolve_backend(request.stt_backend.as_deref())?;
        debug!(%backend, "attempting STT fallback");

        let segments = match backend {
            SttBackendChoice::OpenAi => self.whole_file(request).await,
            SttBackendChoice::Gemini => self.chunked(request).await,
            SttBackendChoice::Local => {
                debug!("local STT backend not implemented");
                None
            }
        };

        let segments = segments.filter(|s| !s.is_empty()).map(normalize_durations);
        let status = if segments.is_some() { "ok" } else { "empty" };
        metrics::counter!(
            telemetry::STT_ATTEMPTS_TOTAL,
            "backend" => backend.as_str(),
            "status" => status
        )
        .increment(1);
        if let Some(segments) = &segments {
            info!(%backend, segments = segments.len(), "STT fallback produced transcript");
        }
        segments
    }

    /// Whisper path: download, transcribe the whole file.
    async fn whole_file(&self, request: &TranscriptRequest) -> Option<Vec<TranscriptSegment>> {
        let Some(backend) = &self.openai else {
            debug!("openai backend not configured");
            return None;
        };
        let audio = match self.downloader.download(&request.key.video_id).await {
            Ok(audio) => audio,
            Err(e) => {
                debug!(error = %e, "audio download failed");
                return None;
            }
        };
        match backend
            .transcribe(audio.path(), language_hint(request), None)
            .await
        {
            Ok(segments) => Some(segments),
            Err(e) => {
                debug!(backend = backend.name(), error = %e, "transcription failed");
                None
            }
        }
    }

    /// Gemini path: download, split, transcribe each chunk at its offset.
    ///
    /// The offset advances by every chunk's probed length, including chunks
    /// that failed to transcribe, so later text keeps its real position.
    async fn chunked(&self, request: &TranscriptRequest) -> Option<Vec<TranscriptSegment>> {
        let Some(backend) = &self.gemini else {
            debug!("gemini backend not configured");
            return None;
        };
        let audio = match self.downloader.download(&request.key.video_id).await {
            Ok(audio) => audio,
            Err(e) => {
                debug!(error = %e, "audio download failed");
                return None;
            }
        };
        let segment_secs = self.runtime.snapshot().gemini_segment_secs;
        let chunks = match self.segmenter.split(audio.path(), segment_secs).await {
            Ok(chunks) if !chunks.paths().is_empty() => chunks,
            Ok(_) => AudioChunks::whole(audio.path()),
            Err(e) => {
                debug!(error = %e, "split failed; transcribing whole file");
                AudioChunks::whole(audio.path())
            }
        };

        let language = language_hint(request);
        let api_key = request.gemini_api_key.as_deref();
        let mut segments = Vec::new();
        let mut offset = 0.0;
        for chunk in chunks.paths() {
            match backend.transcribe(chunk, language, api_key).await {
                Ok(parts) => {
                    let text = parts
                        .iter()
                        .map(|s| s.text.trim())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if text.is_empty() {
                        debug!(chunk = %chunk.display(), "empty chunk transcript; skipping");
                    } else {
                        segments.push(TranscriptSegment::new(text, offset, 0.0));
                    }
                }
                Err(e) => debug!(chunk = %chunk.display(), error = %e, "chunk transcription failed"),
            }
            match self.prober.probe(chunk).await {
                Ok(secs) => offset += secs,
                Err(e) => debug!(chunk = %chunk.display(), error = %e, "duration probe failed"),
            }
        }
        Some(segments)
    }
}

/// Language passed to backends: `None` for `auto`, else the target language.
fn language_hint(request: &TranscriptRequest) -> Option<&str> {
    if request.key.is_auto() {
        None
    } else {
        Some(request.key.target_language())
    }
}
