//! Argument state machine
//!
//! An argument starts in `Processing` and ends in exactly one of the terminal
//! states `Complete` or `Failed`. Terminal states are sticky: the database
//! layer only transitions rows that are still `processing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{Judgment, Persona};

/// Lifecycle status of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentStatus {
    /// Created, pipeline not finished
    Processing,
    /// Judgment persisted
    Complete,
    /// Some stage failed; no judgment exists
    Failed,
}

impl ArgumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentStatus::Processing => "processing",
            ArgumentStatus::Complete => "complete",
            ArgumentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ArgumentStatus::Complete | ArgumentStatus::Failed)
    }
}

impl fmt::Display for ArgumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArgumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ArgumentStatus::Processing),
            "complete" => Ok(ArgumentStatus::Complete),
            "failed" => Ok(ArgumentStatus::Failed),
            other => Err(format!("unknown argument status: {}", other)),
        }
    }
}

/// Timestamped slice of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: i64,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    pub text: String,
}

/// One arbitration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argument {
    pub id: Uuid,
    /// Owning user, issued by the credential service
    pub user_id: i64,
    pub person_a_name: String,
    pub person_b_name: String,
    pub persona: Persona,
    /// Empty until the media stage stores the transcription
    pub transcript: String,
    pub transcript_language: Option<String>,
    pub transcript_duration_seconds: Option<f64>,
    #[serde(default)]
    pub transcript_segments: Vec<TranscriptSegment>,
    pub status: ArgumentStatus,
    pub created_at: DateTime<Utc>,
}

impl Argument {
    /// New argument in `Processing`
    pub fn new(
        user_id: i64,
        person_a_name: impl Into<String>,
        person_b_name: impl Into<String>,
        persona: Persona,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            person_a_name: person_a_name.into(),
            person_b_name: person_b_name.into(),
            persona,
            transcript: transcript.into(),
            transcript_language: None,
            transcript_duration_seconds: None,
            transcript_segments: Vec::new(),
            status: ArgumentStatus::Processing,
            created_at: Utc::now(),
        }
    }

    pub fn has_transcript(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

/// Argument together with its judgment, if one exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentWithJudgment {
    #[serde(flatten)]
    pub argument: Argument,
    pub judgment: Option<Judgment>,
}
