//! Skald error types

use std::time::Duration;

/// Skald error types
#[derive(Debug, thiserror::Error)]
pub enum SkaldError {
    // Upstream/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("upstream error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The upstream answered but produced no segments. Treated as transient:
    /// the caption endpoint returns empty bodies while throttling.
    #[error("empty transcript data")]
    EmptyTranscript,

    // Terminal caption-source conditions
    #[error("no transcripts exist for video {0}")]
    NoTranscripts(String),

    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("no track for video {video_id} in languages {languages:?}")]
    TrackNotFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("translation to '{0}' is not available")]
    TranslationUnavailable(String),

    // Request-level conditions surfaced to callers
    /// Circuit breaker is open for this request key.
    #[error("upstream temporarily unavailable, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("speech-to-text is disabled")]
    SttDisabled,

    #[error("speech-to-text produced no segments")]
    SttFailed,

    // External tooling
    #[error("tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("caption source does not support this operation")]
    Unsupported,
}

impl SkaldError {
    /// Whether a retry may succeed.
    ///
    /// Only rate limiting and empty payloads are transient; everything else,
    /// including plain HTTP failures, propagates without retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::EmptyTranscript)
    }

    /// Whether the caption source reported that no transcript can ever be
    /// obtained for the video (as opposed to a temporary failure).
    pub fn is_no_transcript(&self) -> bool {
        matches!(self, Self::NoTranscripts(_) | Self::TranscriptsDisabled(_))
    }

    /// Retry hint carried by a `RateLimited` or `Throttled` error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Throttled { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }

    /// Map an opaque upstream failure message onto a typed error.
    ///
    /// Collaborators that only surface text (subprocess stderr, SDK strings)
    /// go through here so the retry path can branch on kinds.
    pub fn from_upstream_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("429") || lower.contains("too many requests") {
            SkaldError::RateLimited { retry_after: None }
        } else if lower.contains("no element found") || lower.contains("empty transcript") {
            SkaldError::EmptyTranscript
        } else {
            SkaldError::Http(message)
        }
    }
}

impl From<reqwest::Error> for SkaldError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 => SkaldError::RateLimited { retry_after: None },
            Some(status) => SkaldError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => SkaldError::Http(err.to_string()),
        }
    }
}

/// Result type alias for Skald operations
pub type Result<T> = std::result::Result<T, SkaldError>;
