//! Background arbitration queue
//!
//! Submissions return as soon as the job is queued. A dispatcher task runs
//! each job on its own tokio task and keeps at most one job per argument in
//! flight. On shutdown the dispatcher stops accepting, starts whatever was
//! already queued, and waits for every job to finish.

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use thirdparty_common::events::ArbiterEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::orchestrator::{Orchestrator, ProcessOutcome, SkipReason};
use crate::error::ArbitrationError;
use crate::services::MediaUpload;

/// Queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Arbitration queue is closed")]
    Closed,

    #[error("Arbitration queue is full (capacity {0})")]
    Full(usize),
}

/// Unit of background work
#[derive(Debug)]
pub enum ArbitrationJob {
    /// Transcript already stored; judge it
    Judge { argument_id: Uuid },
    /// Normalize and transcribe the upload, then judge
    Media {
        argument_id: Uuid,
        upload: MediaUpload,
    },
}

impl ArbitrationJob {
    pub fn argument_id(&self) -> Uuid {
        match self {
            ArbitrationJob::Judge { argument_id } | ArbitrationJob::Media { argument_id, .. } => {
                *argument_id
            }
        }
    }
}

type Claims = Arc<Mutex<HashSet<Uuid>>>;

/// Releases an argument's claim when its task ends, panicking or not
struct ClaimGuard {
    claims: Claims,
    argument_id: Uuid,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if let Ok(mut claims) = self.claims.lock() {
            claims.remove(&self.argument_id);
        }
    }
}

fn try_claim(claims: &Claims, argument_id: Uuid) -> Option<ClaimGuard> {
    let mut set = claims.lock().ok()?;
    if !set.insert(argument_id) {
        return None;
    }
    Some(ClaimGuard {
        claims: claims.clone(),
        argument_id,
    })
}

/// Bounded job queue with its dispatcher task
pub struct ArbitrationQueue {
    tx: mpsc::Sender<ArbitrationJob>,
    capacity: usize,
    orchestrator: Arc<Orchestrator>,
    cancel: CancellationToken,
    dispatcher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ArbitrationQueue {
    /// Create the queue and spawn its dispatcher
    ///
    /// Must be called within a tokio runtime.
    pub fn start(orchestrator: Arc<Orchestrator>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        let dispatcher = tokio::spawn(dispatch(orchestrator.clone(), rx, cancel.clone()));

        Self {
            tx,
            capacity,
            orchestrator,
            cancel,
            dispatcher: tokio::sync::Mutex::new(Some(dispatcher)),
        }
    }

    /// Queue a job without waiting
    ///
    /// Publishes [`ArbiterEvent::ArbitrationQueued`] before the job can start.
    pub fn submit(&self, job: ArbitrationJob) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let permit = self.tx.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full(self.capacity),
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;

        let argument_id = job.argument_id();
        self.orchestrator
            .event_bus()
            .emit_lossy(ArbiterEvent::ArbitrationQueued {
                argument_id,
                timestamp: chrono::Utc::now(),
            });
        permit.send(job);

        debug!(argument_id = %argument_id, "Arbitration job queued");
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Stop accepting jobs and wait for queued and running jobs to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Arbitration dispatcher ended abnormally");
            }
        }
    }
}

async fn dispatch(
    orchestrator: Arc<Orchestrator>,
    mut rx: mpsc::Receiver<ArbitrationJob>,
    cancel: CancellationToken,
) {
    let claims: Claims = Arc::new(Mutex::new(HashSet::new()));
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => spawn_job(&mut tasks, &orchestrator, &claims, job),
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
        }
    }

    rx.close();
    while let Some(job) = rx.recv().await {
        spawn_job(&mut tasks, &orchestrator, &claims, job);
    }

    let in_flight = tasks.len();
    if in_flight > 0 {
        info!(in_flight, "Waiting for arbitration jobs to finish");
    }
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }

    debug!("Arbitration dispatcher stopped");
}

fn spawn_job(
    tasks: &mut JoinSet<()>,
    orchestrator: &Arc<Orchestrator>,
    claims: &Claims,
    job: ArbitrationJob,
) {
    let argument_id = job.argument_id();

    let Some(guard) = try_claim(claims, argument_id) else {
        orchestrator.skip(argument_id, SkipReason::AlreadyRunning);
        return;
    };

    let orchestrator = orchestrator.clone();
    tasks.spawn(async move {
        let _guard = guard;

        let run = AssertUnwindSafe(run_job(&orchestrator, job)).catch_unwind().await;
        match run {
            Ok(outcome) => debug!(argument_id = %argument_id, ?outcome, "Arbitration job finished"),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                orchestrator
                    .fail(argument_id, &ArbitrationError::Panicked(message))
                    .await;
            }
        }
    });
}

async fn run_job(orchestrator: &Orchestrator, job: ArbitrationJob) -> ProcessOutcome {
    match job {
        ArbitrationJob::Judge { argument_id } => orchestrator.process_judgment(argument_id).await,
        ArbitrationJob::Media {
            argument_id,
            upload,
        } => orchestrator.process_media(argument_id, upload).await,
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Arbitration task ended abnormally");
    }
}
