//! Runtime configuration read by the acquisition core.
//!
//! Four keys may change while the process runs (an external admin surface
//! owns the mutation and its access control):
//!
//! | key                  | default            |
//! |----------------------|--------------------|
//! | `ENABLE_STT`         | `1` (`0` disables) |
//! | `STT_BACKEND`        | `openai`           |
//! | `GEMINI_MODEL`       | `gemini-1.5-flash` |
//! | `GEMINI_SEGMENT_SEC` | `300`              |
//!
//! The core reads a [`RuntimeSettings`] snapshot per call and never caches it.

use std::sync::RwLock;

use tracing::info;

use crate::{Result, SkaldError};

pub const ENABLE_STT: &str = "ENABLE_STT";
pub const STT_BACKEND: &str = "STT_BACKEND";
pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const GEMINI_SEGMENT_SEC: &str = "GEMINI_SEGMENT_SEC";

/// Keys accepted by [`RuntimeConfig::set`].
pub const MUTABLE_KEYS: [&str; 4] = [ENABLE_STT, STT_BACKEND, GEMINI_MODEL, GEMINI_SEGMENT_SEC];

const DEFAULT_BACKEND: &str = "openai";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_SEGMENT_SECS: u64 = 300;

/// Point-in-time view of the runtime keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub enable_stt: bool,
    /// Raw backend name; resolved (and possibly rejected) at call time.
    pub stt_backend: String,
    pub gemini_model: String,
    pub gemini_segment_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            enable_stt: true,
            stt_backend: DEFAULT_BACKEND.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_segment_secs: DEFAULT_SEGMENT_SECS,
        }
    }
}

impl RuntimeSettings {
    /// Apply one key. `None` or a blank value restores the default.
    fn apply(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let defaults = RuntimeSettings::default();
        match key {
            ENABLE_STT => self.enable_stt = value.is_none_or(|v| v != "0"),
            STT_BACKEND => {
                self.stt_backend = value
                    .map(str::to_lowercase)
                    .unwrap_or(defaults.stt_backend)
            }
            GEMINI_MODEL => {
                self.gemini_model = value.map(str::to_string).unwrap_or(defaults.gemini_model)
            }
            GEMINI_SEGMENT_SEC => {
                self.gemini_segment_secs = match value {
                    Some(v) => v.parse().map_err(|e| {
                        SkaldError::Configuration(format!("{GEMINI_SEGMENT_SEC}='{v}': {e}"))
                    })?,
                    None => defaults.gemini_segment_secs,
                }
            }
            other => {
                return Err(SkaldError::Configuration(format!(
                    "key '{other}' is not runtime-mutable"
                )));
            }
        }
        Ok(())
    }

    fn value_of(&self, key: &str) -> Option<String> {
        match key {
            ENABLE_STT => Some(if self.enable_stt { "1" } else { "0" }.to_string()),
            STT_BACKEND => Some(self.stt_backend.clone()),
            GEMINI_MODEL => Some(self.gemini_model.clone()),
            GEMINI_SEGMENT_SEC => Some(self.gemini_segment_secs.to_string()),
            _ => None,
        }
    }
}

/// Shared, runtime-mutable settings.
#[derive(Debug, Default)]
pub struct RuntimeConfig {
    settings: RwLock<RuntimeSettings>,
}

impl RuntimeConfig {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = RuntimeSettings::default();
        for key in MUTABLE_KEYS {
            if let Some(value) = lookup(key) {
                settings.apply(key, Some(&value))?;
            }
        }
        Ok(Self::new(settings))
    }

    /// Current values.
    pub fn snapshot(&self) -> RuntimeSettings {
        self.settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read one whitelisted key (case-insensitive).
    pub fn get(&self, key: &str) -> Result<String> {
        let key = normalize_key(key)?;
        self.snapshot()
            .value_of(key)
            .ok_or_else(|| SkaldError::Configuration(format!("unknown key '{key}'")))
    }

    /// Set or reset one whitelisted key (case-insensitive).
    pub fn set(&self, key: &str, value: Option<&str>) -> Result<()> {
        let key = normalize_key(key)?;
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        settings.apply(key, value)?;
        info!(key, value = ?settings.value_of(key), "runtime setting changed");
        Ok(())
    }
}

fn normalize_key(key: &str) -> Result<&'static str> {
    let upper = key.trim().to_uppercase();
    MUTABLE_KEYS
        .iter()
        .find(|k| **k == upper)
        .copied()
        .ok_or_else(|| SkaldError::Configuration(format!("key '{upper}' is not allowed")))
}
