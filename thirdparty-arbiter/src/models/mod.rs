//! Data models for the arbiter
//!
//! - Argument lifecycle state machine (processing → complete | failed)
//! - Persona selection (closed set)
//! - Judgment and its validated sub-scores

pub mod argument;
pub mod judgment;
pub mod persona;

pub use argument::{Argument, ArgumentStatus, ArgumentWithJudgment, TranscriptSegment};
pub use judgment::{ConversationScores, Judgment, Winner};
pub use persona::Persona;
