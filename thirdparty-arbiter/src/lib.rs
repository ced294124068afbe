//! thirdparty-arbiter library interface
//!
//! Wires the pipeline services, the orchestrator, the background queue and
//! intake into a single [`Arbiter`] handle used by the CLI and by tests.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ArbitrationError, ArbitrationResult, UploadError};

use sqlx::SqlitePool;
use std::sync::Arc;
use thirdparty_common::events::{ArbiterEvent, EventBus};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::ArbiterConfig;
use crate::models::{Argument, ArgumentWithJudgment};
use crate::services::{
    CompletionService, JudgmentEngine, JudgmentError, MediaNormalizer, OpenAiCompletionClient,
    Transcriber,
};
use crate::workflow::{ArbitrationQueue, Intake, Orchestrator, Submission};

/// Running arbitration service
pub struct Arbiter {
    db: SqlitePool,
    event_bus: EventBus,
    queue: Arc<ArbitrationQueue>,
    intake: Intake,
}

impl Arbiter {
    /// Start against the configured OpenAI-compatible providers
    pub async fn start(db: SqlitePool, config: ArbiterConfig, api_key: String) -> ArbitrationResult<Self> {
        let completion = OpenAiCompletionClient::new(&config.completion, api_key.clone())
            .map_err(JudgmentError::from)?;
        Self::with_completion(db, config, api_key, Arc::new(completion)).await
    }

    /// Start with a caller-supplied completion service
    ///
    /// Fails arguments left `processing` by a previous run before the queue
    /// accepts new jobs.
    pub async fn with_completion(
        db: SqlitePool,
        config: ArbiterConfig,
        api_key: String,
        completion: Arc<dyn CompletionService>,
    ) -> ArbitrationResult<Self> {
        let event_bus = EventBus::new(config.queue.event_bus_capacity);

        let engine = JudgmentEngine::new(completion, config.completion.clone());
        let normalizer = MediaNormalizer::new(config.media.clone());
        let transcriber = Transcriber::new(config.transcription.clone(), api_key)?;

        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            event_bus.clone(),
            engine,
            normalizer,
            transcriber,
        ));
        orchestrator.recover_stale().await?;

        let queue = Arc::new(ArbitrationQueue::start(orchestrator, config.queue.capacity));
        let intake = Intake::new(queue.clone(), config.media.max_upload_bytes);

        Ok(Self {
            db,
            event_bus,
            queue,
            intake,
        })
    }

    /// Validate, persist and queue a submission
    pub async fn submit(&self, submission: Submission) -> ArbitrationResult<Argument> {
        self.intake.submit(submission).await
    }

    pub async fn show(&self, argument_id: Uuid, user_id: i64) -> ArbitrationResult<Option<ArgumentWithJudgment>> {
        Ok(db::arguments::load_argument_for_user(&self.db, argument_id, user_id).await?)
    }

    pub async fn list(&self, user_id: i64) -> ArbitrationResult<Vec<ArgumentWithJudgment>> {
        Ok(db::arguments::list_arguments_for_user(&self.db, user_id).await?)
    }

    /// Delete an argument and its judgment; `false` if the user has no such argument
    pub async fn delete(&self, argument_id: Uuid, user_id: i64) -> ArbitrationResult<bool> {
        Ok(db::arguments::delete_argument(&self.db, argument_id, user_id).await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArbiterEvent> {
        self.event_bus.subscribe()
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Stop accepting submissions and wait for queued work to finish
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
