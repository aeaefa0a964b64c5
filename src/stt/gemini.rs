//! Google Gemini transcription client.
//!
//! Sends the audio to `generateContent` with a plain-transcript prompt.
//! Small files travel inline as base64. Larger ones (typically a whole
//! download after a failed split) go through the resumable file API first
//! and are deleted again once transcribed. Gemini returns untimed text, so
//! each call yields at most one segment starting at 0; the coordinator
//! places it on the timeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::audio_mime;
use super::traits::SpeechToText;
use crate::config::RuntimeConfig;
use crate::types::TranscriptSegment;
use crate::{Result, SkaldError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Raw bytes sent inline at most. Base64 grows them by a third and the
/// whole request must stay under 20 MB.
pub const DEFAULT_INLINE_LIMIT: usize = 14 * 1024 * 1024;

const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(2);
const UPLOAD_POLL_ATTEMPTS: u32 = 30;

/// Client for the Gemini `generateContent` endpoint.
///
/// The model name is read from [`RuntimeConfig`] on every call.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    runtime: Arc<RuntimeConfig>,
    inline_limit: usize,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, runtime: Arc<RuntimeConfig>) -> Self {
        Self::with_base_url(api_key, runtime, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        api_key: Option<String>,
        runtime: Arc<RuntimeConfig>,
        base_url: impl Into<String>,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            runtime,
            inline_limit: DEFAULT_INLINE_LIMIT,
        }
    }

    /// Files larger than `bytes` are uploaded instead of sent inline.
    pub fn inline_limit(mut self, bytes: usize) -> Self {
        self.inline_limit = bytes;
        self
    }

    /// Upload `bytes` with the resumable protocol and wait until the file is usable.
    async fn upload(
        &self,
        key: &str,
        audio: &Path,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<UploadedFile> {
        let display_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&UploadStart {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;
        let start = check_status(start).await?;
        let session = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| SkaldError::Api {
                status: start.status().as_u16(),
                message: "upload session URL missing".to_string(),
            })?;

        let size = bytes.len();
        let finished = self
            .http
            .post(session)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let mut file = check_status(finished).await?.json::<FileEnvelope>().await?.file;
        debug!(name = %file.name, size, "audio uploaded to gemini file api");

        for _ in 0..UPLOAD_POLL_ATTEMPTS {
            match file.state.as_deref() {
                Some("PROCESSING") => {
                    tokio::time::sleep(UPLOAD_POLL_INTERVAL).await;
                    let response = self
                        .http
                        .get(format!("{}/v1beta/{}", self.base_url, file.name))
                        .header("x-goog-api-key", key)
                        .send()
                        .await?;
                    file = check_status(response).await?.json().await?;
                }
                Some("FAILED") => {
                    return Err(SkaldError::Api {
                        status: 422,
                        message: format!("{}: processing failed", file.name),
                    });
                }
                _ => return Ok(file),
            }
        }
        Err(SkaldError::Api {
            status: 504,
            message: format!("{}: still processing", file.name),
        })
    }

    /// Best-effort removal of an uploaded file.
    async fn delete(&self, key: &str, file: &UploadedFile) {
        let outcome = self
            .http
            .delete(format!("{}/v1beta/{}", self.base_url, file.name))
            .header("x-goog-api-key", key)
            .send()
            .await;
        match outcome {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(name = %file.name, status = %response.status(), "failed to delete uploaded audio")
            }
            Err(e) => warn!(name = %file.name, error = %e, "failed to delete uploaded audio"),
        }
    }

    async fn generate(&self, key: &str, model: &str, request: &GenerateRequest) -> Result<String> {
        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await?;
        let body: GenerateResponse = check_status(response).await?.json().await?;
        Ok(body.text())
    }
}

/// Map non-success statuses onto [`SkaldError`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        429 => SkaldError::RateLimited { retry_after: None },
        code => SkaldError::Api {
            status: code,
            message,
        },
    })
}

fn prompt(language: Option<&str>) -> String {
    format!(
        "Transcribe this audio to {} text only. Return raw transcript without extra commentary.",
        language.unwrap_or("its original spoken language")
    )
}

#[async_trait]
impl SpeechToText for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.api_key.as_deref())
            .ok_or_else(|| SkaldError::Configuration("GOOGLE_API_KEY is not set".to_string()))?;
        let model = self.runtime.snapshot().gemini_model;

        let bytes = tokio::fs::read(audio).await?;
        let mime = audio_mime(audio);
        let (media, uploaded) = if bytes.len() > self.inline_limit {
            let file = self.upload(key, audio, bytes, mime).await?;
            let part = RequestPart::FileData {
                file_data: FileData {
                    mime_type: mime.to_string(),
                    file_uri: file.uri.clone(),
                },
            };
            (part, Some(file))
        } else {
            let part = RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: mime.to_string(),
                    data: BASE64_STANDARD.encode(&bytes),
                },
            };
            (part, None)
        };
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    media,
                    RequestPart::Text {
                        text: prompt(language),
                    },
                ],
            }],
        };

        let text = self.generate(key, &model, &request).await;
        if let Some(file) = &uploaded {
            self.delete(key, file).await;
        }
        let text = text?;
        debug!(model = %model, chars = text.len(), "gemini transcription received");
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TranscriptSegment::new(text, 0.0, 0.0)])
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData { inline_data: InlineData },
    FileData { file_data: FileData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct UploadStart {
    file: UploadMetadata,
}

#[derive(Debug, Serialize)]
struct UploadMetadata {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: UploadedFile,
}

/// A file held by the Gemini file API (`files/...`).
#[derive(Debug, Deserialize)]
struct UploadedFile {
    name: String,
    uri: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated and trimmed.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}
