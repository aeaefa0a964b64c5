//! Caption source backed by `yt-dlp` metadata.
//!
//! Listing runs `yt-dlp --dump-single-json --skip-download` and reads the
//! `subtitles` (human-authored) and `automatic_captions` (generated) maps.
//! Each track is located by its json3 caption URL; translations reuse that
//! URL with a `tlang` parameter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use super::CaptionSource;
use crate::process::ToolCommand;
use crate::types::{TrackDescriptor, TranscriptSegment};
use crate::{Result, SkaldError};

const DEFAULT_BINARY: &str = "yt-dlp";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// `yt-dlp` + json3 caption source.
#[derive(Clone)]
pub struct YtDlpCaptionSource {
    binary: String,
    http: Client,
}

impl Default for YtDlpCaptionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpCaptionSource {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_BINARY)
    }

    /// Use a specific `yt-dlp` binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_http(binary, http)
    }

    /// Use a specific `yt-dlp` binary and HTTP client (for testing with wiremock).
    pub fn with_http(binary: impl Into<String>, http: Client) -> Self {
        Self {
            binary: binary.into(),
            http,
        }
    }

    async fn video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let stdout = ToolCommand::new(&self.binary)
            .args(["--dump-single-json", "--skip-download", "--no-warnings"])
            .arg(format!("{WATCH_URL}{video_id}"))
            .output()
            .await?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TrackDescriptor>> {
        let tracks = tracks_from_info(&self.video_info(video_id).await?);
        if tracks.is_empty() {
            return Err(SkaldError::NoTranscripts(video_id.to_string()));
        }
        Ok(tracks)
    }

    async fn fetch(&self, track: &TrackDescriptor) -> Result<Vec<TranscriptSegment>> {
        if track.locator.is_empty() {
            return Err(SkaldError::InvalidInput(format!(
                "track {} has no caption URL",
                track.label()
            )));
        }
        let mut request = self.http.get(&track.locator);
        if let Some(target) = &track.translated_to {
            request = request.query(&[("tlang", target.as_str())]);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(SkaldError::RateLimited { retry_after });
            }
            status if !status.is_success() => {
                return Err(SkaldError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            debug!(track = %track.label(), "caption endpoint returned an empty body");
            return Ok(Vec::new());
        }
        parse_json3(&body)
    }

    async fn direct_fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>> {
        let tracks = self.list_tracks(video_id).await?;
        for language in languages {
            let found = tracks
                .iter()
                .filter(|t| t.language_code == *language)
                .min_by_key(|t| t.is_generated);
            if let Some(track) = found {
                return self.fetch(track).await;
            }
        }
        Err(SkaldError::TrackNotFound {
            video_id: video_id.to_string(),
            languages: languages.to_vec(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionFormat>>,
}

#[derive(Debug, Deserialize)]
struct CaptionFormat {
    #[serde(default)]
    ext: String,
    url: String,
    #[serde(default)]
    name: Option<String>,
}

/// Manual tracks first, then generated ones. Generated entries that are
/// already machine translations (`tlang` in the URL) are not real tracks.
fn tracks_from_info(info: &VideoInfo) -> Vec<TrackDescriptor> {
    let manual = info
        .subtitles
        .iter()
        .filter(|(code, _)| code.as_str() != "live_chat")
        .filter_map(|(code, formats)| {
            let format = json3_format(formats)?;
            Some(TrackDescriptor::manual(code, display_name(code, format)).with_locator(&format.url))
        });

    let generated = info
        .automatic_captions
        .iter()
        .filter_map(|(code, formats)| {
            let format = json3_format(formats)?;
            if format.url.contains("tlang=") {
                return None;
            }
            let code = code.strip_suffix("-orig").unwrap_or(code);
            Some(
                TrackDescriptor::generated(code, display_name(code, format))
                    .with_locator(&format.url),
            )
        });

    let mut tracks: Vec<TrackDescriptor> = manual.collect();
    for track in generated {
        let duplicate = tracks
            .iter()
            .any(|t| t.is_generated && t.language_code == track.language_code);
        if !duplicate {
            tracks.push(track);
        }
    }
    tracks
}

fn json3_format(formats: &[CaptionFormat]) -> Option<&CaptionFormat> {
    formats.iter().find(|f| f.ext == "json3")
}

fn display_name(code: &str, format: &CaptionFormat) -> String {
    format.name.clone().unwrap_or_else(|| code.to_string())
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 caption document. Events without text (window and style
/// markers, bare newlines) are dropped.
fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>> {
    let doc: Json3 = serde_json::from_str(body)?;
    Ok(doc
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms.unwrap_or(0) as f64 / 1000.0,
            ))
        })
        .collect())
}
