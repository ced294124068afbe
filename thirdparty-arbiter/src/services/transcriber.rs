//! Speech-to-text client
//!
//! Uploads a normalized audio file to an OpenAI-compatible
//! `/audio/transcriptions` endpoint and returns the verbose transcription
//! (text, detected language, duration and timestamped segments).
//!
//! The file is streamed from disk rather than read into memory. Deleting it
//! is the caller's job.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::config::TranscriptionSettings;
use crate::models::TranscriptSegment;

const USER_AGENT: &str = concat!("thirdparty-arbiter/", env!("CARGO_PKG_VERSION"));

/// Transcription errors
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider returned no speech
    #[error("Transcription is empty")]
    EmptyTranscript,
}

/// Verbose transcription result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "duration")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcription {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Speech-to-text API client
pub struct Transcriber {
    http_client: reqwest::Client,
    settings: TranscriptionSettings,
    api_key: String,
}

impl Transcriber {
    pub fn new(settings: TranscriptionSettings, api_key: String) -> Result<Self, TranscriptionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
            api_key,
        })
    }

    /// Transcribe an audio file
    pub async fn transcribe(&self, path: &Path) -> Result<Transcription, TranscriptionError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        debug!(
            file = %path.display(),
            bytes = length,
            model = %self.settings.model,
            "Uploading audio for transcription"
        );

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(file_name);

        let form = Form::new()
            .text("model", self.settings.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .part("file", part);

        let response = self
            .http_client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let transcription: Transcription =
            serde_json::from_str(&body).map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        debug!(
            chars = transcription.text.len(),
            segments = transcription.segments.len(),
            language = ?transcription.language,
            "Transcription received"
        );

        Ok(transcription)
    }
}
