//! Arbitration workflow
//!
//! Intake validates and persists a submission, the queue runs it in the
//! background, and the orchestrator moves the argument through the pipeline
//! to `complete` or `failed`.

pub mod intake;
pub mod orchestrator;
pub mod queue;

pub use intake::{Intake, Submission, SubmissionContent};
pub use orchestrator::{Orchestrator, ProcessOutcome, SkipReason};
pub use queue::{ArbitrationJob, ArbitrationQueue, QueueError};
