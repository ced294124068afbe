//! Scripted completion service
//!
//! Replays canned replies in order and records every request.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use thirdparty_arbiter::services::{CompletionError, CompletionRequest, CompletionService};

pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Same reply for every call
    pub fn always(reply: &str) -> Self {
        Self::new((0..32).map(|_| Ok(reply.to_string())).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyResponse))
    }
}

/// Contract-conforming reply
pub fn verdict_reply(winner: &str, scores: [u8; 5]) -> String {
    serde_json::json!({
        "winner": winner,
        "reasoning": "The first speaker stayed calm and owned their part.",
        "respect": scores[0],
        "empathy": scores[1],
        "accountability": scores[2],
        "emotional_regulation": scores[3],
        "manipulation_toxicity": scores[4],
    })
    .to_string()
}
