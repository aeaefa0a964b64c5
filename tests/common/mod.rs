//! Scripted collaborators shared by the integration tests.
//!
//! Every mock records how it was called so tests can assert on the exact
//! sequence of upstream interactions.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use skald::stt::{AudioChunks, AudioFile};
use skald::{
    AudioDownloader, AudioSegmenter, CaptionSource, DurationProber, Result, RetryConfig,
    RuntimeConfig, SkaldError, SpeechToText, SttFallbackCoordinator, TrackDescriptor,
    TranscriptSegment,
};

// ============================================================================
// Scripted outcomes
// ============================================================================

/// One scripted result. Errors are built fresh per call since
/// `SkaldError` is not `Clone`.
#[derive(Clone)]
pub enum Step {
    Segments(Vec<TranscriptSegment>),
    Fail(fn() -> SkaldError),
}

impl Step {
    pub fn text(text: &str) -> Self {
        Step::Segments(vec![TranscriptSegment::new(text, 0.0, 1.0)])
    }

    pub fn lines(lines: &[(&str, f64)]) -> Self {
        Step::Segments(
            lines
                .iter()
                .map(|(text, start)| TranscriptSegment::new(*text, *start, 0.0))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Step::Segments(Vec::new())
    }

    pub fn rate_limited() -> Self {
        Step::Fail(|| SkaldError::RateLimited { retry_after: None })
    }

    pub fn permanent() -> Self {
        Step::Fail(|| SkaldError::Api {
            status: 404,
            message: "gone".to_string(),
        })
    }

    fn resolve(&self) -> Result<Vec<TranscriptSegment>> {
        match self {
            Step::Segments(segments) => Ok(segments.clone()),
            Step::Fail(make) => Err(make()),
        }
    }
}

/// Queue of steps; the last step repeats forever.
#[derive(Default)]
struct Script {
    steps: HashMap<String, VecDeque<Step>>,
}

impl Script {
    fn push(&mut self, key: impl Into<String>, steps: Vec<Step>) {
        self.steps.insert(key.into(), steps.into());
    }

    fn next(&mut self, key: &str) -> Option<Step> {
        let queue = self.steps.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// Retry policy that keeps the real attempt count but barely waits.
pub fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .base_delay(Duration::from_millis(1))
        .max_jitter(Duration::ZERO)
}

// ============================================================================
// Caption source
// ============================================================================

/// Caption source whose listing, fetches and direct fetches are scripted.
///
/// Fetches are keyed by [`TrackDescriptor::label`] (`"en"`,
/// `"en (generated)"`, `"de->en"`), direct fetches by the comma-joined
/// language list. Anything unscripted fails permanently.
pub struct ScriptedSource {
    listing: bool,
    tracks: std::result::Result<Vec<TrackDescriptor>, fn() -> SkaldError>,
    fetches: Mutex<Script>,
    direct: Mutex<Script>,
    translate_fails: bool,
    list_calls: AtomicU32,
    fetch_log: Mutex<Vec<String>>,
    direct_log: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            listing: true,
            tracks: Ok(tracks),
            fetches: Mutex::new(Script::default()),
            direct: Mutex::new(Script::default()),
            translate_fails: false,
            list_calls: AtomicU32::new(0),
            fetch_log: Mutex::new(Vec::new()),
            direct_log: Mutex::new(Vec::new()),
        }
    }

    /// Listing fails with the given error.
    pub fn listing_error(mut self, make: fn() -> SkaldError) -> Self {
        self.tracks = Err(make);
        self
    }

    /// Source that cannot enumerate tracks.
    pub fn without_listing(mut self) -> Self {
        self.listing = false;
        self
    }

    pub fn on_fetch(self, label: &str, steps: Vec<Step>) -> Self {
        self.fetches.lock().unwrap().push(label, steps);
        self
    }

    pub fn on_direct(self, languages: &[&str], steps: Vec<Step>) -> Self {
        self.direct.lock().unwrap().push(languages.join(","), steps);
        self
    }

    /// `translate` refuses every track.
    pub fn translate_fails(mut self) -> Self {
        self.translate_fails = true;
        self
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_log(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }

    pub fn direct_log(&self) -> Vec<Vec<String>> {
        self.direct_log.lock().unwrap().clone()
    }

    /// Total upstream calls of any kind.
    pub fn upstream_calls(&self) -> usize {
        self.list_calls() as usize + self.fetch_log().len() + self.direct_log().len()
    }
}

#[async_trait]
impl CaptionSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_listing(&self) -> bool {
        self.listing
    }

    async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TrackDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.tracks {
            Ok(tracks) => Ok(tracks.clone()),
            Err(make) => Err(make()),
        }
    }

    async fn fetch(&self, track: &TrackDescriptor) -> Result<Vec<TranscriptSegment>> {
        let label = track.label();
        self.fetch_log.lock().unwrap().push(label.clone());
        let step = self.fetches.lock().unwrap().next(&label);
        step.unwrap_or_else(Step::permanent).resolve()
    }

    async fn translate(&self, track: &TrackDescriptor, target: &str) -> Result<TrackDescriptor> {
        if self.translate_fails || !track.is_translatable {
            return Err(SkaldError::TranslationUnavailable(target.to_string()));
        }
        Ok(track.translated(target))
    }

    async fn direct_fetch(
        &self,
        _video_id: &str,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>> {
        self.direct_log.lock().unwrap().push(languages.to_vec());
        let step = self.direct.lock().unwrap().next(&languages.join(","));
        step.unwrap_or_else(Step::permanent).resolve()
    }
}

// ============================================================================
// Speech-to-text collaborators
// ============================================================================

/// Downloader that writes a small file into its own scratch directory.
pub struct MockDownloader {
    fail: bool,
    calls: AtomicU32,
    last_path: Mutex<Option<PathBuf>>,
}

impl MockDownloader {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicU32::new(0),
            last_path: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Path of the most recently downloaded file.
    pub fn last_path(&self) -> Option<PathBuf> {
        self.last_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioDownloader for MockDownloader {
    async fn download(&self, video_id: &str) -> Result<AudioFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SkaldError::Tool {
                tool: "yt-dlp".to_string(),
                message: format!("{video_id}: video unavailable"),
            });
        }
        let workspace = tempfile::Builder::new().prefix("skald-test-").tempdir()?;
        let path = workspace.path().join("audio.mp3");
        std::fs::write(&path, b"ID3 fake audio")?;
        *self.last_path.lock().unwrap() = Some(path.clone());
        Ok(AudioFile::in_workspace(path, workspace))
    }
}

/// Segmenter that writes placeholder chunk files into a fresh temp directory.
pub struct MockSegmenter {
    chunks: Option<Vec<&'static str>>,
    requested_secs: Mutex<Vec<u64>>,
    last_workspace: Mutex<Option<PathBuf>>,
}

impl MockSegmenter {
    pub fn chunks(names: &[&'static str]) -> Self {
        Self {
            chunks: Some(names.to_vec()),
            requested_secs: Mutex::new(Vec::new()),
            last_workspace: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            chunks: None,
            requested_secs: Mutex::new(Vec::new()),
            last_workspace: Mutex::new(None),
        }
    }

    pub fn requested_secs(&self) -> Vec<u64> {
        self.requested_secs.lock().unwrap().clone()
    }

    /// Directory holding the chunks of the most recent split.
    pub fn last_workspace(&self) -> Option<PathBuf> {
        self.last_workspace.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSegmenter for MockSegmenter {
    async fn split(&self, _audio: &Path, segment_secs: u64) -> Result<AudioChunks> {
        self.requested_secs.lock().unwrap().push(segment_secs);
        let Some(names) = &self.chunks else {
            return Err(SkaldError::Tool {
                tool: "ffmpeg".to_string(),
                message: "invalid data found when processing input".to_string(),
            });
        };
        let workspace = tempfile::Builder::new().prefix("skald-chunks-").tempdir()?;
        let mut paths = Vec::with_capacity(names.len());
        for name in names {
            let path = workspace.path().join(name);
            std::fs::write(&path, b"ID3 fake chunk")?;
            paths.push(path);
        }
        *self.last_workspace.lock().unwrap() = Some(workspace.path().to_path_buf());
        Ok(AudioChunks::in_workspace(paths, workspace))
    }
}

/// Prober answering from a file-name table; unknown files fail.
pub struct MockProber {
    durations: HashMap<String, f64>,
}

impl MockProber {
    pub fn new(durations: &[(&str, f64)]) -> Self {
        Self {
            durations: durations
                .iter()
                .map(|(name, secs)| (name.to_string(), *secs))
                .collect(),
        }
    }
}

#[async_trait]
impl DurationProber for MockProber {
    async fn probe(&self, audio: &Path) -> Result<f64> {
        let name = file_name(audio);
        self.durations.get(&name).copied().ok_or(SkaldError::Tool {
            tool: "ffprobe".to_string(),
            message: format!("{name}: no duration"),
        })
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct SttCall {
    pub file: String,
    pub language: Option<String>,
    pub api_key: Option<String>,
}

/// STT backend scripted per input file name.
pub struct MockStt {
    name: &'static str,
    outcomes: HashMap<String, Step>,
    fallback: Step,
    calls: Mutex<Vec<SttCall>>,
}

impl MockStt {
    /// Every file yields `step`.
    pub fn always(name: &'static str, step: Step) -> Self {
        Self {
            name,
            outcomes: HashMap::new(),
            fallback: step,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Per-file outcomes; unknown files fail.
    pub fn per_file(name: &'static str, outcomes: Vec<(&str, Step)>) -> Self {
        Self {
            name,
            outcomes: outcomes
                .into_iter()
                .map(|(file, step)| (file.to_string(), step))
                .collect(),
            fallback: Step::permanent(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SttCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechToText for MockStt {
    fn name(&self) -> &str {
        self.name
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let file = file_name(audio);
        self.calls.lock().unwrap().push(SttCall {
            file: file.clone(),
            language: language.map(str::to_string),
            api_key: api_key.map(str::to_string),
        });
        self.outcomes.get(&file).unwrap_or(&self.fallback).resolve()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Runtime config with some keys overridden, the rest at defaults.
pub fn runtime(overrides: &[(&str, &str)]) -> Arc<RuntimeConfig> {
    let overrides: HashMap<String, String> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(RuntimeConfig::from_lookup(|key| overrides.get(key).cloned()).unwrap())
}

/// Coordinator with the given collaborators and no backends attached.
pub fn coordinator(
    runtime: Arc<RuntimeConfig>,
    downloader: Arc<MockDownloader>,
    segmenter: Arc<MockSegmenter>,
    prober: Arc<MockProber>,
) -> SttFallbackCoordinator {
    SttFallbackCoordinator::new(runtime, downloader, segmenter, prober)
}
