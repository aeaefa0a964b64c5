//! Skald - resilient video transcript acquisition
//!
//! This crate fetches a timed transcript for a video from an upstream
//! caption source that rate-limits aggressively and is inconsistently
//! available. It layers:
//!
//! - a prioritized fallback cascade over caption tracks
//!   ([`TranscriptSourceSelector`])
//! - retry with exponential backoff and jitter for transient failures
//!   ([`RetryExecutor`])
//! - a success cache and a circuit breaker keyed by request fingerprint
//! - speech-to-text fallback when no caption track can be obtained
//!   ([`SttFallbackCoordinator`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skald::{Skald, TranscriptRequest, YtDlpCaptionSource};
//!
//! #[tokio::main]
//! async fn main() -> skald::Result<()> {
//!     let service = Skald::builder()
//!         .caption_source(Arc::new(YtDlpCaptionSource::new()))
//!         .build()?;
//!
//!     let request = TranscriptRequest::new("dQw4w9WgXcQ", "en");
//!     for segment in service.fetch(&request).await? {
//!         println!("[{:>7.2}] {}", segment.start, segment.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod normalize;
mod process;
pub mod retry;
pub mod service;
#[cfg(feature = "cli")]
pub mod settings;
pub mod source;
pub mod stt;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, Clock, FailureCache, ManualClock, SuccessCache, SystemClock};
pub use config::{RuntimeConfig, RuntimeSettings};
pub use error::{Result, SkaldError};
pub use normalize::normalize_durations;
pub use retry::{RetryConfig, RetryExecutor};
pub use service::{Skald, SkaldBuilder, TranscriptService};
pub use source::{CaptionSource, SelectionTier, TranscriptSourceSelector, YtDlpCaptionSource};
pub use stt::{
    AudioDownloader, AudioSegmenter, DurationProber, SpeechToText, SttFallbackCoordinator,
};
pub use types::{
    AUTO_LANGUAGE, RequestKey, SttBackendChoice, TrackDescriptor, TranscriptRequest,
    TranscriptSegment,
};
pub use version::{BuildInfo, PKG_VERSION, version_string};
