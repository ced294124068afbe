//! Judgment engine
//!
//! Builds the prompt for an argument, asks the completion service for a
//! verdict, and validates the reply against the `verdict-json/2` contract.
//! A reply either validates completely or yields an error; there is no
//! partial result.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::completion_client::{ChatMessage, CompletionError, CompletionRequest, CompletionService};
use super::prompt_builder::{build_prompt, response_format, CONTRACT_VERSION, SCORE_FIELDS};
use crate::config::CompletionSettings;
use crate::models::{Argument, ConversationScores, Judgment, Winner};

/// Judgment errors
#[derive(Debug, Error)]
pub enum JudgmentError {
    /// Completion provider failed; passed through unmodified
    #[error("Completion provider error: {0}")]
    Upstream(#[from] CompletionError),

    /// Reply does not follow the output contract
    #[error("Invalid model output: {reason}")]
    InvalidModelOutput { reason: String, raw: String },

    /// Sub-score missing the [1, 10] integer range
    #[error("Score {field} out of range: {value}")]
    ScoreRange { field: &'static str, value: Value },
}

/// Validated verdict, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentResult {
    pub winner: Winner,
    pub reasoning: String,
    pub scores: ConversationScores,
    pub conversation_health_score: u8,
    pub full_response: String,
}

impl JudgmentResult {
    pub fn into_judgment(self, argument_id: Uuid) -> Judgment {
        Judgment {
            id: Uuid::new_v4(),
            argument_id,
            winner: self.winner,
            reasoning: self.reasoning,
            full_response: self.full_response,
            scores: self.scores,
            conversation_health_score: self.conversation_health_score,
            contract_version: CONTRACT_VERSION.to_string(),
            created_at: chrono::Utc::now(),
        }
    }
}

pub struct JudgmentEngine {
    completion: Arc<dyn CompletionService>,
    settings: CompletionSettings,
}

impl JudgmentEngine {
    pub fn new(completion: Arc<dyn CompletionService>, settings: CompletionSettings) -> Self {
        Self {
            completion,
            settings,
        }
    }

    /// Request body for an argument under the configured decoding policy
    pub fn request_for(&self, argument: &Argument) -> CompletionRequest {
        let prompt = build_prompt(
            argument.persona,
            &argument.person_a_name,
            &argument.person_b_name,
            &argument.transcript,
        );

        CompletionRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
            response_format: self.settings.structured_output.then(response_format),
        }
    }

    /// Judge an argument
    pub async fn judge(&self, argument: &Argument) -> Result<JudgmentResult, JudgmentError> {
        let request = self.request_for(argument);

        debug!(
            argument_id = %argument.id,
            persona = %argument.persona,
            "Requesting judgment"
        );

        let raw = self.completion.complete(&request).await?;

        parse_reply(&raw).inspect_err(|e| {
            warn!(argument_id = %argument.id, error = %e, "Model reply rejected");
        })
    }
}

/// Validate a raw model reply
pub fn parse_reply(raw: &str) -> Result<JudgmentResult, JudgmentError> {
    let invalid = |reason: String| JudgmentError::InvalidModelOutput {
        reason,
        raw: raw.to_string(),
    };

    let body = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| invalid(format!("not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid("reply is not a JSON object".to_string()))?;

    let winner_token = object
        .get("winner")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string field winner".to_string()))?;
    let winner = parse_winner(winner_token)
        .ok_or_else(|| invalid(format!("unknown winner {:?}", winner_token)))?;

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| invalid("missing or empty reasoning".to_string()))?;

    let mut values = [0u8; 5];
    for (slot, field) in values.iter_mut().zip(SCORE_FIELDS) {
        let value = object
            .get(field)
            .ok_or_else(|| invalid(format!("missing score {}", field)))?;
        *slot = score_in_range(value).ok_or_else(|| JudgmentError::ScoreRange {
            field,
            value: value.clone(),
        })?;
    }

    let scores = ConversationScores {
        respect: values[0],
        empathy: values[1],
        accountability: values[2],
        emotional_regulation: values[3],
        manipulation_toxicity: values[4],
    };

    Ok(JudgmentResult {
        winner,
        reasoning: reasoning.to_string(),
        conversation_health_score: scores.health_score(),
        scores,
        full_response: raw.to_string(),
    })
}

/// Remove one optional surrounding ``` or ```json fence
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = strip_info_token(rest);

    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Drop the info token after an opening fence
///
/// `json` is removed even when the object follows on the same line
/// (```` ```json{...} ````). Any other token is removed only when
/// whitespace follows it.
fn strip_info_token(rest: &str) -> &str {
    let token_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let (token, after) = rest.split_at(token_len);

    if token.eq_ignore_ascii_case("json") {
        after
    } else if !token.is_empty() && after.starts_with(char::is_whitespace) {
        after
    } else {
        rest
    }
}

fn parse_winner(token: &str) -> Option<Winner> {
    match token.trim().to_ascii_lowercase().as_str() {
        "person_a" => Some(Winner::PersonA),
        "person_b" => Some(Winner::PersonB),
        "tie" => Some(Winner::Tie),
        _ => None,
    }
}

fn score_in_range(value: &Value) -> Option<u8> {
    value
        .as_i64()
        .filter(|n| (ConversationScores::MIN as i64..=ConversationScores::MAX as i64).contains(n))
        .map(|n| n as u8)
}
