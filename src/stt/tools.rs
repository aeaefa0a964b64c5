//! Subprocess-backed audio collaborators: yt-dlp, ffmpeg, ffprobe.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::traits::{AudioChunks, AudioDownloader, AudioFile, AudioSegmenter, DurationProber};
use crate::process::ToolCommand;
use crate::{Result, SkaldError};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

fn workspace(prefix: &str) -> Result<tempfile::TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Files in `dir` whose name satisfies `keep`, sorted by name.
async fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_str().is_some_and(&keep) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Downloads the best audio stream with `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    binary: String,
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpDownloader {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioDownloader for YtDlpDownloader {
    async fn download(&self, video_id: &str) -> Result<AudioFile> {
        let dir = workspace("skald-audio-")?;
        ToolCommand::new(&self.binary)
            .args(["-f", "bestaudio/best", "--no-playlist", "--quiet", "-o"])
            .path(&dir.path().join("audio.%(ext)s"))
            .arg(format!("{WATCH_URL}{video_id}"))
            .run()
            .await?;

        let path = list_files(dir.path(), |name| name.starts_with("audio."))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SkaldError::Tool {
                tool: self.binary.clone(),
                message: "no audio file produced".to_string(),
            })?;
        debug!(video_id, path = %path.display(), "audio downloaded");
        Ok(AudioFile::in_workspace(path, dir))
    }
}

/// Splits audio into mono 16 kHz mp3 parts with `ffmpeg -f segment`.
#[derive(Debug, Clone)]
pub struct FfmpegSegmenter {
    binary: String,
}

impl Default for FfmpegSegmenter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegSegmenter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioSegmenter for FfmpegSegmenter {
    async fn split(&self, audio: &Path, segment_secs: u64) -> Result<AudioChunks> {
        let dir = workspace("skald-parts-")?;
        ToolCommand::new(&self.binary)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .path(audio)
            .args(["-vn", "-acodec", "libmp3lame", "-ar", "16000", "-ac", "1"])
            .args(["-f", "segment", "-segment_time"])
            .arg(segment_secs.max(1).to_string())
            .path(&dir.path().join("part_%03d.mp3"))
            .run()
            .await?;

        let parts = list_files(dir.path(), |name| {
            name.starts_with("part_") && name.ends_with(".mp3")
        })
        .await?;
        if parts.is_empty() {
            return Err(SkaldError::Tool {
                tool: self.binary.clone(),
                message: "segmenter produced no parts".to_string(),
            });
        }
        debug!(parts = parts.len(), segment_secs, "audio split");
        Ok(AudioChunks::in_workspace(parts, dir))
    }
}

/// Reads container duration with `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: String,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProber {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DurationProber for FfprobeProber {
    async fn probe(&self, audio: &Path) -> Result<f64> {
        let stdout = ToolCommand::new(&self.binary)
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=nokey=1:noprint_wrappers=1"])
            .path(audio)
            .output()
            .await?;
        parse_duration(&String::from_utf8_lossy(&stdout))
    }
}

fn parse_duration(output: &str) -> Result<f64> {
    let raw = output.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or_else(|| SkaldError::Tool {
            tool: "ffprobe".to_string(),
            message: format!("unparseable duration '{raw}'"),
        })
}
