//! Transcript segment type

use serde::{Deserialize, Serialize};

/// One timed line of a transcript.
///
/// Serializes to the canonical `{text, start, duration}` shape regardless
/// of which caption track or speech-to-text backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start offset in seconds.
    pub start: f64,
    /// Duration in seconds. Zero or negative means "unknown" until normalized.
    #[serde(default)]
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}
