//! Submission intake
//!
//! Validates a submission, creates the argument in `processing` and hands
//! the work to the queue. Validation failures are returned synchronously and
//! leave no row behind; everything after queueing is reported through the
//! event bus.

use std::sync::Arc;
use tracing::info;

use super::queue::{ArbitrationJob, ArbitrationQueue};
use crate::db::arguments::create_argument;
use crate::error::{ArbitrationError, ArbitrationResult, UploadError};
use crate::models::{Argument, Persona};
use crate::services::MediaUpload;

/// What is being arbitrated
#[derive(Debug, Clone)]
pub enum SubmissionContent {
    /// Recording to normalize and transcribe
    Media(MediaUpload),
    /// Transcript supplied as text
    Transcript(String),
}

/// One arbitration request
#[derive(Debug, Clone)]
pub struct Submission {
    pub user_id: i64,
    /// Persona key; unknown keys fall back to the mediator
    pub persona_key: String,
    pub person_a_name: String,
    pub person_b_name: String,
    pub content: SubmissionContent,
}

pub struct Intake {
    queue: Arc<ArbitrationQueue>,
    max_upload_bytes: u64,
}

impl Intake {
    pub fn new(queue: Arc<ArbitrationQueue>, max_upload_bytes: u64) -> Self {
        Self {
            queue,
            max_upload_bytes,
        }
    }

    /// Accept a submission and queue it
    ///
    /// Returns the new argument, still `processing`.
    pub async fn submit(&self, submission: Submission) -> ArbitrationResult<Argument> {
        let person_a = required_name(&submission.person_a_name, "person_a_name")?;
        let person_b = required_name(&submission.person_b_name, "person_b_name")?;

        match &submission.content {
            SubmissionContent::Media(upload) => validate_upload(upload, self.max_upload_bytes)?,
            SubmissionContent::Transcript(text) if text.trim().is_empty() => {
                return Err(UploadError::EmptyTranscript.into())
            }
            SubmissionContent::Transcript(_) => {}
        }

        let persona = Persona::resolve(&submission.persona_key);
        let (transcript, upload) = match submission.content {
            SubmissionContent::Transcript(text) => (text.trim().to_string(), None),
            SubmissionContent::Media(upload) => (String::new(), Some(upload)),
        };

        let argument = Argument::new(submission.user_id, person_a, person_b, persona, transcript);
        let orchestrator = self.queue.orchestrator();
        create_argument(orchestrator.db(), &argument).await?;

        let job = match upload {
            Some(upload) => ArbitrationJob::Media {
                argument_id: argument.id,
                upload,
            },
            None => ArbitrationJob::Judge {
                argument_id: argument.id,
            },
        };

        if let Err(e) = self.queue.submit(job) {
            let err: ArbitrationError = e.into();
            orchestrator.fail(argument.id, &err).await;
            return Err(err);
        }

        info!(
            argument_id = %argument.id,
            user_id = argument.user_id,
            persona = %argument.persona,
            "Argument accepted"
        );

        Ok(argument)
    }
}

fn required_name<'a>(name: &'a str, field: &'static str) -> Result<&'a str, UploadError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UploadError::MissingName(field));
    }
    Ok(trimmed)
}

/// Size ceiling first, then content sniffing
///
/// Uploads must be strictly smaller than `max_upload_bytes`.
pub fn validate_upload(upload: &MediaUpload, max_upload_bytes: u64) -> Result<(), UploadError> {
    if upload.bytes.is_empty() {
        return Err(UploadError::EmptyFile);
    }
    if upload.size() >= max_upload_bytes {
        return Err(UploadError::TooLarge {
            size: upload.size(),
            max: max_upload_bytes,
        });
    }

    match infer::get(&upload.bytes) {
        Some(kind)
            if matches!(
                kind.matcher_type(),
                infer::MatcherType::Audio | infer::MatcherType::Video
            ) =>
        {
            Ok(())
        }
        Some(kind) => Err(UploadError::UnsupportedFormat(kind.mime_type().to_string())),
        None => Err(UploadError::UnsupportedFormat("unknown".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header() -> Vec<u8> {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    #[test]
    fn test_size_is_checked_before_format() {
        let upload = MediaUpload::new("big.txt", vec![b'x'; 100]);
        assert!(matches!(
            validate_upload(&upload, 10),
            Err(UploadError::TooLarge { size: 100, max: 10 })
        ));
    }

    #[test]
    fn test_ceiling_is_exclusive() {
        let at_ceiling = MediaUpload::new("fight.wav", wav_header());
        let ceiling = at_ceiling.size();
        assert!(matches!(
            validate_upload(&at_ceiling, ceiling),
            Err(UploadError::TooLarge { size, max }) if size == ceiling && max == ceiling
        ));
        assert!(validate_upload(&at_ceiling, ceiling + 1).is_ok());
    }

    #[test]
    fn test_rejects_non_media() {
        let pdf = MediaUpload::new("a.mp3", b"%PDF-1.7\n%more bytes here".to_vec());
        assert!(matches!(
            validate_upload(&pdf, 1 << 20),
            Err(UploadError::UnsupportedFormat(mime)) if mime == "application/pdf"
        ));

        let text = MediaUpload::new("a.mp3", b"hello there".to_vec());
        assert!(matches!(validate_upload(&text, 1 << 20), Err(UploadError::UnsupportedFormat(_))));

        let empty = MediaUpload::new("a.mp3", Vec::new());
        assert!(matches!(validate_upload(&empty, 1 << 20), Err(UploadError::EmptyFile)));
    }

    #[test]
    fn test_accepts_wav() {
        let upload = MediaUpload::new("fight.wav", wav_header());
        assert!(validate_upload(&upload, 1 << 20).is_ok());
    }

    #[test]
    fn test_names_are_trimmed_and_required() {
        assert_eq!(required_name("  Alex ", "person_a_name").unwrap(), "Alex");
        assert!(matches!(
            required_name(" \t", "person_b_name"),
            Err(UploadError::MissingName("person_b_name"))
        ));
    }
}
