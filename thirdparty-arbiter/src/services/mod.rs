//! Pipeline services
//!
//! Each stage of the arbitration pipeline, in execution order:
//! media normalization, transcription, prompt construction and judgment.

pub mod completion_client;
pub mod judgment_engine;
pub mod media_normalizer;
pub mod prompt_builder;
pub mod transcriber;

pub use completion_client::{
    ChatMessage, ChatRole, CompletionError, CompletionRequest, CompletionService,
    OpenAiCompletionClient,
};
pub use judgment_engine::{JudgmentEngine, JudgmentError, JudgmentResult};
pub use media_normalizer::{MediaNormalizer, MediaProcessingError, MediaUpload, NormalizedAudio};
pub use prompt_builder::{build_prompt, Prompt, CONTRACT_VERSION};
pub use transcriber::{Transcriber, Transcription, TranscriptionError};
