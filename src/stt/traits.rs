//! Speech-to-text collaborator traits.
//!
//! Every collaborator may fail; the coordinator collapses failures into
//! "no result". Temporary files are owned by the returned handles and are
//! deleted when the handle drops, whatever the outcome of the attempt.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::Result;
use crate::types::TranscriptSegment;

/// A downloaded audio file. Dropping it removes its scratch directory.
#[derive(Debug)]
pub struct AudioFile {
    path: PathBuf,
    _workspace: TempDir,
}

impl AudioFile {
    /// Audio living inside a scratch directory owned by this handle.
    pub fn in_workspace(path: PathBuf, workspace: TempDir) -> Self {
        Self {
            path,
            _workspace: workspace,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Chunks produced by an [`AudioSegmenter`], in playback order.
#[derive(Debug)]
pub struct AudioChunks {
    paths: Vec<PathBuf>,
    _workspace: Option<TempDir>,
}

impl AudioChunks {
    pub fn in_workspace(paths: Vec<PathBuf>, workspace: TempDir) -> Self {
        Self {
            paths,
            _workspace: Some(workspace),
        }
    }

    /// The input file as its own single chunk.
    pub fn whole(path: &Path) -> Self {
        Self {
            paths: vec![path.to_path_buf()],
            _workspace: None,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Fetches the audio track of a video.
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    async fn download(&self, video_id: &str) -> Result<AudioFile>;
}

/// Splits audio into fixed-length chunks.
#[async_trait]
pub trait AudioSegmenter: Send + Sync {
    async fn split(&self, audio: &Path, segment_secs: u64) -> Result<AudioChunks>;
}

/// Measures the playback length of an audio file in seconds.
#[async_trait]
pub trait DurationProber: Send + Sync {
    async fn probe(&self, audio: &Path) -> Result<f64>;
}

/// A speech-to-text backend.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Transcribe one file. Segment offsets are relative to the file start.
    ///
    /// `language` is a hint (`None` lets the backend detect it);
    /// `api_key` overrides the configured credential for this call.
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>>;
}
