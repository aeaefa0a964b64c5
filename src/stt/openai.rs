//! OpenAI Whisper transcription client.
//!
//! Posts the audio file to `/v1/audio/transcriptions` with
//! `response_format=verbose_json` to get timestamped segments.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::traits::SpeechToText;
use super::audio_mime;
use crate::types::TranscriptSegment;
use crate::{Result, SkaldError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "whisper-1";

/// Client for the OpenAI transcription endpoint.
#[derive(Clone)]
pub struct WhisperClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    model: String,
}

impl WhisperClient {
    /// Create a client. Without a key every call fails with a configuration
    /// error, which the coordinator treats as "backend unavailable".
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let key = api_key
            .or(self.api_key.as_deref())
            .ok_or_else(|| SkaldError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(audio_mime(audio))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .http
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => SkaldError::RateLimited { retry_after: None },
                code => SkaldError::Api {
                    status: code,
                    message,
                },
            });
        }

        let body: VerboseTranscription = response.json().await?;
        debug!(segments = body.segments.len(), "whisper transcription received");
        Ok(body.into_segments())
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

impl VerboseTranscription {
    /// Timestamped segments, or the flat text as one segment at 0 with
    /// unknown duration when the backend returned no segments.
    fn into_segments(self) -> Vec<TranscriptSegment> {
        if self.segments.is_empty() {
            let text = self.text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            return vec![TranscriptSegment::new(text, 0.0, 0.0)];
        }
        self.segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.text.trim(), s.start, (s.end - s.start).max(0.0)))
            .collect()
    }
}
