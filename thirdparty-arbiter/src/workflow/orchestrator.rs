//! Arbitration orchestrator
//!
//! Drives one argument from `processing` to a terminal status.
//!
//! # Pipelines
//! - Text: judge → persist judgment and complete (one transaction)
//! - Media: normalize → transcribe → store transcript → text pipeline
//!
//! Any stage failure marks the argument `failed` and publishes
//! [`ArbiterEvent::ArbitrationFailed`]. Arguments already `complete` or
//! `failed` are skipped without writes.

use chrono::Utc;
use sqlx::SqlitePool;
use std::fmt;
use thirdparty_common::events::{ArbiterEvent, EventBus};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::arguments::{fail_stale_arguments, finish_processing, load_argument, store_transcript};
use crate::db::judgments::save_judgment_and_complete;
use crate::error::{ArbitrationError, ArbitrationResult};
use crate::models::{ArgumentStatus, Winner};
use crate::services::{
    JudgmentEngine, MediaNormalizer, MediaUpload, Transcriber, TranscriptionError,
};

/// Why a job ended without doing any work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    AlreadyComplete,
    AlreadyFailed,
    /// Another job for the same argument is in flight
    AlreadyRunning,
    /// Status left `processing` while this job was working
    NoLongerProcessing,
}

impl SkipReason {
    fn for_status(status: ArgumentStatus) -> Option<Self> {
        match status {
            ArgumentStatus::Processing => None,
            ArgumentStatus::Complete => Some(SkipReason::AlreadyComplete),
            ArgumentStatus::Failed => Some(SkipReason::AlreadyFailed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotFound => "not_found",
            SkipReason::AlreadyComplete => "already_complete",
            SkipReason::AlreadyFailed => "already_failed",
            SkipReason::AlreadyRunning => "already_running",
            SkipReason::NoLongerProcessing => "no_longer_processing",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one orchestrator run
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed {
        judgment_id: Uuid,
        winner: Winner,
        conversation_health_score: u8,
    },
    Skipped(SkipReason),
    Failed {
        stage: &'static str,
        error: String,
    },
}

pub struct Orchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    engine: JudgmentEngine,
    normalizer: MediaNormalizer,
    transcriber: Transcriber,
}

impl Orchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        engine: JudgmentEngine,
        normalizer: MediaNormalizer,
        transcriber: Transcriber,
    ) -> Self {
        Self {
            db,
            event_bus,
            engine,
            normalizer,
            transcriber,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Judge an argument whose transcript is already stored
    pub async fn process_judgment(&self, argument_id: Uuid) -> ProcessOutcome {
        match self.run_judgment(argument_id).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(argument_id, &e).await,
        }
    }

    /// Normalize and transcribe an upload, then judge the argument
    pub async fn process_media(&self, argument_id: Uuid, upload: MediaUpload) -> ProcessOutcome {
        match self.run_media(argument_id, &upload).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => self.process_judgment(argument_id).await,
            Err(e) => self.fail(argument_id, &e).await,
        }
    }

    async fn run_judgment(&self, argument_id: Uuid) -> ArbitrationResult<ProcessOutcome> {
        let argument = match load_argument(&self.db, argument_id).await? {
            Some(argument) => argument,
            None => return Ok(self.skip(argument_id, SkipReason::NotFound)),
        };
        if let Some(reason) = SkipReason::for_status(argument.status) {
            return Ok(self.skip(argument_id, reason));
        }
        // A complete argument always has a transcript
        if !argument.has_transcript() {
            return Err(TranscriptionError::EmptyTranscript.into());
        }

        self.stage_started(argument_id, "judge");
        let result = self.engine.judge(&argument).await?;
        let judgment = result.into_judgment(argument_id);

        self.stage_started(argument_id, "persist");
        if !save_judgment_and_complete(&self.db, &judgment).await? {
            return Ok(self.skip(argument_id, SkipReason::NoLongerProcessing));
        }

        info!(
            argument_id = %argument_id,
            judgment_id = %judgment.id,
            winner = %judgment.winner,
            health_score = judgment.conversation_health_score,
            "Arbitration complete"
        );

        self.event_bus.emit_lossy(ArbiterEvent::ArbitrationCompleted {
            argument_id,
            judgment_id: judgment.id,
            winner: judgment.winner.to_string(),
            conversation_health_score: judgment.conversation_health_score,
            timestamp: Utc::now(),
        });

        Ok(ProcessOutcome::Completed {
            judgment_id: judgment.id,
            winner: judgment.winner,
            conversation_health_score: judgment.conversation_health_score,
        })
    }

    /// Media stages up to the stored transcript
    ///
    /// `Ok(None)` means the transcript is stored and judging may proceed.
    async fn run_media(
        &self,
        argument_id: Uuid,
        upload: &MediaUpload,
    ) -> ArbitrationResult<Option<ProcessOutcome>> {
        let argument = match load_argument(&self.db, argument_id).await? {
            Some(argument) => argument,
            None => return Ok(Some(self.skip(argument_id, SkipReason::NotFound))),
        };
        if let Some(reason) = SkipReason::for_status(argument.status) {
            return Ok(Some(self.skip(argument_id, reason)));
        }

        self.stage_started(argument_id, "normalize");
        let audio = self.normalizer.normalize(upload).await?;

        self.stage_started(argument_id, "transcribe");
        let transcription = self.transcriber.transcribe(audio.path()).await;
        drop(audio);
        let transcription = transcription?;

        if transcription.is_empty() {
            return Err(TranscriptionError::EmptyTranscript.into());
        }

        if !store_transcript(&self.db, argument_id, &transcription).await? {
            return Ok(Some(self.skip(argument_id, SkipReason::NoLongerProcessing)));
        }

        debug!(
            argument_id = %argument_id,
            chars = transcription.text.len(),
            "Transcript stored"
        );

        Ok(None)
    }

    /// Mark an argument failed and publish the failure
    ///
    /// A no-op on the row if the argument is already terminal or gone.
    pub async fn fail(&self, argument_id: Uuid, err: &ArbitrationError) -> ProcessOutcome {
        let stage = err.stage();
        error!(argument_id = %argument_id, stage, error = %err, "Arbitration failed");

        match finish_processing(&self.db, argument_id, ArgumentStatus::Failed).await {
            Ok(true) => {}
            Ok(false) => debug!(argument_id = %argument_id, "Argument already terminal, status unchanged"),
            Err(e) => warn!(argument_id = %argument_id, error = %e, "Failed to mark argument failed"),
        }

        self.event_bus.emit_lossy(ArbiterEvent::ArbitrationFailed {
            argument_id,
            stage: stage.to_string(),
            error: err.to_string(),
            timestamp: Utc::now(),
        });

        ProcessOutcome::Failed {
            stage,
            error: err.to_string(),
        }
    }

    pub(crate) fn skip(&self, argument_id: Uuid, reason: SkipReason) -> ProcessOutcome {
        info!(argument_id = %argument_id, reason = %reason, "Arbitration skipped");

        self.event_bus.emit_lossy(ArbiterEvent::ArbitrationSkipped {
            argument_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });

        ProcessOutcome::Skipped(reason)
    }

    fn stage_started(&self, argument_id: Uuid, stage: &str) {
        debug!(argument_id = %argument_id, stage, "Stage started");
        self.event_bus.emit_lossy(ArbiterEvent::StageStarted {
            argument_id,
            stage: stage.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Fail arguments left `processing` by a previous run
    ///
    /// Call once at startup, before the queue accepts jobs.
    pub async fn recover_stale(&self) -> ArbitrationResult<usize> {
        let count = fail_stale_arguments(&self.db).await?;
        if count > 0 {
            warn!(count, "Marked interrupted arguments as failed");
        }
        Ok(count)
    }
}
