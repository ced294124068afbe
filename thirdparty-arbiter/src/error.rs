//! Error types for the arbiter
//!
//! Each service owns its error enum (media, transcription, completion,
//! judgment, queue). [`ArbitrationError`] aggregates them so the workflow can
//! record which stage failed.

use thiserror::Error;

use crate::services::{JudgmentError, MediaProcessingError, TranscriptionError};
use crate::workflow::QueueError;

/// Submission rejected before any argument is created
#[derive(Debug, Error)]
pub enum UploadError {
    /// A participant name is missing or blank
    #[error("Participant name is required: {0}")]
    MissingName(&'static str),

    /// Upload has no content
    #[error("Uploaded file is empty")]
    EmptyFile,

    /// Upload reaches the configured ceiling
    #[error("File too large: {size} bytes (limit {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// Content is not recognizable audio or video
    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),

    /// Text submission with no transcript
    #[error("Transcript text is empty")]
    EmptyTranscript,
}

/// Any failure of the arbitration pipeline
#[derive(Debug, Error)]
pub enum ArbitrationError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    MediaProcessing(#[from] MediaProcessingError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Judgment(#[from] JudgmentError),

    /// Store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] thirdparty_common::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Background task panicked before reaching a terminal state
    #[error("Arbitration task panicked: {0}")]
    Panicked(String),
}

impl ArbitrationError {
    /// Pipeline stage the error belongs to, for logs and failure events
    pub fn stage(&self) -> &'static str {
        match self {
            ArbitrationError::Upload(_) => "intake",
            ArbitrationError::MediaProcessing(_) => "normalize",
            ArbitrationError::Transcription(_) => "transcribe",
            ArbitrationError::Judgment(_) => "judge",
            ArbitrationError::Persistence(_) => "persist",
            ArbitrationError::Queue(_) => "queue",
            ArbitrationError::Panicked(_) => "worker",
        }
    }
}

/// Result type for pipeline operations
pub type ArbitrationResult<T> = Result<T, ArbitrationError>;
