//! Speech-to-text fallback.
//!
//! When no caption track can be obtained, [`SttFallbackCoordinator`]
//! downloads the audio and transcribes it with the configured backend:
//!
//! - `openai`: whole file through Whisper, timestamped segments
//! - `gemini`: fixed-length chunks, one untimed segment per chunk placed at
//!   the cumulative probed offset
//! - `local`: reserved, always yields nothing
//!
//! The collaborators (downloader, segmenter, prober, backends) are traits;
//! [`tools`] and the HTTP clients are the production implementations.

mod coordinator;
mod gemini;
mod openai;
pub mod tools;
mod traits;

pub use coordinator::SttFallbackCoordinator;
pub use gemini::GeminiClient;
pub use openai::WhisperClient;
pub use tools::{FfmpegSegmenter, FfprobeProber, YtDlpDownloader};
pub use traits::{
    AudioChunks, AudioDownloader, AudioFile, AudioSegmenter, DurationProber, SpeechToText,
};

use std::path::Path;

/// MIME type for an audio file, by extension.
pub(crate) fn audio_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_by_extension() {
        assert_eq!(audio_mime(Path::new("/tmp/part_000.MP3")), "audio/mpeg");
        assert_eq!(audio_mime(Path::new("audio.webm")), "audio/webm");
        assert_eq!(audio_mime(Path::new("audio")), "application/octet-stream");
    }
}
