//! Judgment model
//!
//! Created once per argument after a successful engine run, never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical verdict domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    PersonA,
    PersonB,
    Tie,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::PersonA => "person_a",
            Winner::PersonB => "person_b",
            Winner::Tie => "tie",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Winner {
    type Err = String;

    /// Exact canonical token; model output goes through the engine's own
    /// case-insensitive mapping instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person_a" => Ok(Winner::PersonA),
            "person_b" => Ok(Winner::PersonB),
            "tie" => Ok(Winner::Tie),
            other => Err(format!("unknown winner: {}", other)),
        }
    }
}

/// Five conversation-health sub-scores, each validated to [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationScores {
    pub respect: u8,
    pub empathy: u8,
    pub accountability: u8,
    pub emotional_regulation: u8,
    /// 10 = no manipulation or toxicity present
    pub manipulation_toxicity: u8,
}

impl ConversationScores {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Twice the sum of the sub-scores: [10, 100] for validated scores
    pub fn health_score(&self) -> u8 {
        let sum = self.respect as u16
            + self.empathy as u16
            + self.accountability as u16
            + self.emotional_regulation as u16
            + self.manipulation_toxicity as u16;
        (sum * 2) as u8
    }
}

/// Persisted verdict for one argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub id: Uuid,
    pub argument_id: Uuid,
    pub winner: Winner,
    pub reasoning: String,
    /// Raw model reply, kept for audit
    pub full_response: String,
    #[serde(flatten)]
    pub scores: ConversationScores,
    pub conversation_health_score: u8,
    /// Output contract the reply was validated against
    pub contract_version: String,
    pub created_at: DateTime<Utc>,
}
