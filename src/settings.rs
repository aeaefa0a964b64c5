//! File configuration for the `skald` binary.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.skald/config.toml` (user)
//! 3. `/etc/skald/config.toml` (system)
//!
//! Without any file the built-in defaults apply.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.skald/secrets.toml` (user, must be 0600)
//! 2. `/etc/skald/secrets.toml` (system, must be 0600)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::config::RuntimeConfig;
use crate::retry::RetryConfig;
use crate::service::{Skald, TranscriptService};
use crate::source::YtDlpCaptionSource;
use crate::stt::{
    FfmpegSegmenter, FfprobeProber, GeminiClient, SttFallbackCoordinator, WhisperClient,
    YtDlpDownloader,
};
use crate::{Result, SkaldError};

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub tools: ToolPaths,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Cache sizes and lifetimes.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Maximum entries per cache (default: 10000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Transcript lifetime in seconds (default: 1800).
    #[serde(default = "default_success_ttl")]
    pub success_ttl_secs: u64,
    /// Cooldown after finding nothing, in seconds (default: 300).
    #[serde(default = "default_failure_cooldown")]
    pub failure_cooldown_secs: u64,
    /// Cooldown after an upstream error, in seconds (default: 120).
    #[serde(default = "default_upstream_cooldown")]
    pub upstream_error_cooldown_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            success_ttl_secs: default_success_ttl(),
            failure_cooldown_secs: default_failure_cooldown(),
            upstream_error_cooldown_secs: default_upstream_cooldown(),
        }
    }
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_success_ttl() -> u64 {
    1800
}

fn default_failure_cooldown() -> u64 {
    300
}

fn default_upstream_cooldown() -> u64 {
    120
}

/// Retry tuning for caption fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff in milliseconds (default: 1200).
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Jitter upper bound in milliseconds (default: 600).
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_jitter_ms: default_max_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1200
}

fn default_max_jitter() -> u64 {
    600
}

/// External tool binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: default_yt_dlp(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

fn default_yt_dlp() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

/// Base URL overrides for the STT APIs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub gemini_base_url: Option<String>,
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
    #[serde(default)]
    pub google: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Provider name → environment variable name mapping.
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist; otherwise a missing file means defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SkaldError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SkaldError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SkaldError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".skald").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/skald/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .success_ttl(Duration::from_secs(self.cache.success_ttl_secs))
            .failure_cooldown(Duration::from_secs(self.cache.failure_cooldown_secs))
            .upstream_error_cooldown(Duration::from_secs(self.cache.upstream_error_cooldown_secs))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts)
            .base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .max_jitter(Duration::from_millis(self.retry.max_jitter_ms))
    }

    /// Wire the production collaborators into a service.
    pub fn build_service(
        &self,
        secrets: &Secrets,
        runtime: Arc<RuntimeConfig>,
    ) -> Result<TranscriptService> {
        let whisper = match &self.endpoints.openai_base_url {
            Some(url) => WhisperClient::with_base_url(secrets.api_key("openai"), url),
            None => WhisperClient::new(secrets.api_key("openai")),
        };
        let gemini = match &self.endpoints.gemini_base_url {
            Some(url) => GeminiClient::with_base_url(secrets.api_key("google"), runtime.clone(), url),
            None => GeminiClient::new(secrets.api_key("google"), runtime.clone()),
        };
        let stt = SttFallbackCoordinator::new(
            runtime,
            Arc::new(YtDlpDownloader::new(&self.tools.yt_dlp)),
            Arc::new(FfmpegSegmenter::new(&self.tools.ffmpeg)),
            Arc::new(FfprobeProber::new(&self.tools.ffprobe)),
        )
        .openai(Arc::new(whisper))
        .gemini(Arc::new(gemini));

        let source = YtDlpCaptionSource::with_binary(&self.tools.yt_dlp);
        Skald::builder()
            .caption_source(Arc::new(source))
            .stt(stt)
            .retry(self.retry_config())
            .cache(self.cache_config())
            .build()
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".skald").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/skald/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SkaldError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SkaldError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            SkaldError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(SkaldError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a provider, falling back to the corresponding environment variable.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let from_file = match provider {
            "openai" => self.openai.as_ref(),
            "google" => self.google.as_ref(),
            _ => None,
        }
        .map(|s| s.api_key.clone());

        from_file.or_else(|| {
            PROVIDER_ENV_VARS
                .iter()
                .find(|(name, _)| *name == provider)
                .and_then(|(_, env_var)| std::env::var(env_var).ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let config = Config::default();
        let cache = config.cache_config();
        assert_eq!(cache.success_ttl, Duration::from_secs(1800));
        assert_eq!(cache.failure_cooldown, Duration::from_secs(300));
        assert_eq!(cache.upstream_error_cooldown, Duration::from_secs(120));
        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(1200));
        assert_eq!(config.tools.yt_dlp, "yt-dlp");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
            [cache]
            success_ttl_secs = 600

            [retry]
            max_attempts = 3

            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.success_ttl_secs, 600);
        assert_eq!(config.cache.failure_cooldown_secs, 300);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1200);
        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tools.ffprobe, "ffprobe");
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [google]
            api_key = "g-test-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.google.as_ref().unwrap().api_key, "g-test-key");
        assert!(secrets.openai.is_none());
    }

    #[test]
    fn api_key_from_secrets() {
        let secrets = Secrets {
            openai: Some(ApiKeySecret {
                api_key: "from-file".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(secrets.api_key("openai"), Some("from-file".to_string()));
        assert_eq!(secrets.api_key("nonexistent"), None);
    }

    #[test]
    fn explicit_config_must_exist() {
        let err = Config::load(Some(Path::new("/nonexistent/skald.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_entries = 42\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.max_entries, 42);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_readable_secrets() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(Secrets::check_permissions(&path).is_err());
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        assert!(Secrets::check_permissions(&path).is_ok());
    }
}
