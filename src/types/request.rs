//! Request types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SkaldError;

/// Sentinel language meaning "whatever the video has".
pub const AUTO_LANGUAGE: &str = "auto";

/// Identity of a logical transcript request; keys both caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub video_id: String,
    pub language: String,
    pub disable_translate: bool,
}

impl RequestKey {
    pub fn new(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            language: language.into(),
            disable_translate: false,
        }
    }

    pub fn disable_translate(mut self, disabled: bool) -> Self {
        self.disable_translate = disabled;
        self
    }

    /// Whether the requested language is the `auto` sentinel (case-insensitive).
    pub fn is_auto(&self) -> bool {
        self.language.eq_ignore_ascii_case(AUTO_LANGUAGE)
    }

    /// Language used as translation target and STT hint; blank means English.
    pub fn target_language(&self) -> &str {
        if self.language.trim().is_empty() {
            "en"
        } else {
            &self.language
        }
    }

    /// `[requested, "en", "en-US", "en-GB"]`, duplicates kept.
    pub fn preferred_languages(&self) -> Vec<String> {
        vec![
            self.language.clone(),
            "en".to_string(),
            "en-US".to_string(),
            "en-GB".to_string(),
        ]
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}",
            self.video_id,
            self.language,
            if self.disable_translate {
                " (no translate)"
            } else {
                ""
            }
        )
    }
}

/// Speech-to-text backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttBackendChoice {
    Gemini,
    /// OpenAI Whisper API.
    #[default]
    OpenAi,
    /// Reserved; never produces segments.
    Local,
}

impl SttBackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for SttBackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SttBackendChoice {
    type Err = SkaldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "local" => Ok(Self::Local),
            other => Err(SkaldError::InvalidInput(format!(
                "unknown STT backend '{other}'"
            ))),
        }
    }
}

/// A transcript request as received from the outer request surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub key: RequestKey,
    /// Allow falling back to speech-to-text. Default: true.
    pub stt_fallback: bool,
    /// Backend override (raw name); runtime configuration applies when unset.
    pub stt_backend: Option<String>,
    /// Skip caption sources and go straight to speech-to-text.
    pub force_stt: bool,
    /// Per-request Gemini API key.
    pub gemini_api_key: Option<String>,
}

impl TranscriptRequest {
    pub fn new(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            key: RequestKey::new(video_id, language),
            stt_fallback: true,
            stt_backend: None,
            force_stt: false,
            gemini_api_key: None,
        }
    }

    pub fn disable_translate(mut self, disabled: bool) -> Self {
        self.key.disable_translate = disabled;
        self
    }

    pub fn stt_fallback(mut self, enabled: bool) -> Self {
        self.stt_fallback = enabled;
        self
    }

    pub fn stt_backend(mut self, backend: impl Into<String>) -> Self {
        self.stt_backend = Some(backend.into());
        self
    }

    pub fn force_stt(mut self, force: bool) -> Self {
        self.force_stt = force;
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }
}
