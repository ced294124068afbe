//! Configuration for the arbiter
//!
//! The bootstrap TOML file carries the shared [`TomlConfig`] keys at the top
//! level plus one section per pipeline service. Every key has a built-in
//! default, so an empty or missing file is a valid configuration.
//!
//! The provider API key is resolved with priority Database → ENV → TOML.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::time::Duration;
use thirdparty_common::config::TomlConfig;
use thirdparty_common::{Error, Result};
use tracing::{info, warn};

/// Primary environment variable for the provider API key
pub const API_KEY_ENV: &str = "THIRDPARTY_OPENAI_API_KEY";
/// Fallback environment variable (the provider's conventional name)
pub const API_KEY_ENV_FALLBACK: &str = "OPENAI_API_KEY";

/// Full arbiter configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArbiterConfig {
    #[serde(flatten)]
    pub base: TomlConfig,

    #[serde(default)]
    pub media: MediaSettings,

    #[serde(default)]
    pub transcription: TranscriptionSettings,

    #[serde(default)]
    pub completion: CompletionSettings,

    #[serde(default)]
    pub queue: QueueSettings,
}

/// Encoder and upload limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Encoder executable (looked up in PATH unless absolute)
    pub encoder_program: String,
    /// Hard deadline for one encode
    pub encoder_timeout_ms: u64,
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub codec: String,
    pub bitrate: String,
    /// Container extension of the normalized file
    pub output_extension: String,
    /// Directory for transient media (defaults to `<tmp>/thirdparty-uploads`)
    pub scratch_dir: Option<PathBuf>,
    /// Uploads of this size or larger are rejected at intake
    pub max_upload_bytes: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            encoder_program: "ffmpeg".to_string(),
            encoder_timeout_ms: 60_000,
            sample_rate_hz: 16_000,
            channels: 1,
            codec: "aac".to_string(),
            bitrate: "96k".to_string(),
            output_extension: "m4a".to_string(),
            scratch_dir: None,
            max_upload_bytes: 50 << 20,
        }
    }
}

impl MediaSettings {
    pub fn encoder_timeout(&self) -> Duration {
        Duration::from_millis(self.encoder_timeout_ms)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("thirdparty-uploads"))
    }
}

/// Speech-to-text provider
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub endpoint: String,
    pub model: String,
    pub request_timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            request_timeout_seconds: 300,
        }
    }
}

/// Completion provider and decoding policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for schema-constrained JSON output
    pub structured_output: bool,
    pub request_timeout_seconds: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            structured_output: true,
            request_timeout_seconds: 120,
        }
    }
}

/// Background queue sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Jobs waiting for dispatch before submissions are refused
    pub capacity: usize,
    pub event_bus_capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            event_bus_capacity: 100,
        }
    }
}

/// Resolve the provider API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_openai_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    let db_key = crate::db::settings::get_openai_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    if db_key.is_some() {
        sources.push("database");
    }

    let env_key = [API_KEY_ENV, API_KEY_ENV_FALLBACK]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|k| is_valid_key(k)));
    if env_key.is_some() {
        sources.push("environment");
    }

    let toml_key = toml_config
        .openai_api_key
        .clone()
        .filter(|k| is_valid_key(k));
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("API key loaded from database");
        return Ok(key);
    }
    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "API key not configured. Please configure using one of:\n\
         1. CLI: thirdparty-arbiter set-api-key <key>\n\
         2. Environment: {}=your-key-here (or {})\n\
         3. TOML config: openai_api_key = \"your-key\"",
        API_KEY_ENV, API_KEY_ENV_FALLBACK
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_reference_defaults() {
        let config: ArbiterConfig = toml::from_str("").unwrap();
        assert_eq!(config.media.encoder_program, "ffmpeg");
        assert_eq!(config.media.encoder_timeout(), Duration::from_secs(60));
        assert_eq!(config.media.sample_rate_hz, 16_000);
        assert_eq!(config.media.channels, 1);
        assert_eq!(config.media.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.max_tokens, 500);
        assert!((config.completion.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn test_sections_override_individual_keys() {
        let config: ArbiterConfig = toml::from_str(
            r#"
            openai_api_key = "sk-file"

            [logging]
            level = "debug"

            [media]
            encoder_timeout_ms = 5000

            [completion]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.base.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.base.logging.level, "debug");
        assert_eq!(config.media.encoder_timeout_ms, 5000);
        assert_eq!(config.media.codec, "aac");
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.max_tokens, 500);
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("sk-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
