//! Prompt construction for the judgment model
//!
//! Pure functions: persona + participant names + transcript in, chat
//! messages out. The system message pins down the output contract
//! ([`CONTRACT_VERSION`]); the user message carries only the transcript.

use serde_json::{json, Value};

use crate::models::Persona;

/// Output contract the engine validates replies against
pub const CONTRACT_VERSION: &str = "verdict-json/2";

/// Sub-score fields, in the order the rubric lists them
pub const SCORE_FIELDS: [&str; 5] = [
    "respect",
    "empathy",
    "accountability",
    "emotional_regulation",
    "manipulation_toxicity",
];

/// System and user message pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Narrative policy for the `reasoning` field
fn persona_policy(persona: Persona) -> &'static str {
    match persona {
        Persona::Mediator => {
            "You are a calm and even-handed mediator.\n\
             Write the \"reasoning\" in measured, neutral language that helps both people \
             understand what went wrong and how to repair it."
        }
        Persona::Judge => {
            "You are a stern television courtroom judge.\n\
             Write the \"reasoning\" as a blunt ruling from the bench: short sentences, \
             no hedging, and no patience for excuses."
        }
        Persona::Comedic => {
            "You are a theatrical judge with a comedian's timing.\n\
             Write the \"reasoning\" with playful exaggeration and light teasing, while \
             still making the decision unmistakable. Finish the \"reasoning\" with a one-line joke."
        }
    }
}

/// Build the chat prompt for one argument
pub fn build_prompt(persona: Persona, person_a: &str, person_b: &str, transcript: &str) -> Prompt {
    let system = format!(
        r#"{policy}

Output contract: {contract}

Two people had a dispute. Decide who handled it better.

Participants:
- person_a is {a}. The FIRST speaker in the transcript is always person_a.
- person_b is {b}. The SECOND speaker in the transcript is always person_b.

Refer to the participants by name ({a} and {b}) inside "reasoning".
The "winner" field must be exactly one of: "person_a", "person_b", "tie".

Harmful behavior decides the outcome:
- A participant shown to lie, deceive, manipulate, gaslight, betray or intentionally hurt the other loses.
- This outweighs tone, politeness and delivery.
- The only exception is when the other participant did something clearly worse.

Score the conversation in five categories, each an integer from 1 to 10:
- respect
- empathy
- accountability
- emotional_regulation
- manipulation_toxicity
10 means very healthy behavior and 1 means very unhealthy behavior.
For manipulation_toxicity, 10 means none was present and 1 means it was extreme.

Reply with a single JSON object and nothing else:
{{
  "winner": "person_a" | "person_b" | "tie",
  "reasoning": "two or three sentences",
  "respect": 1-10,
  "empathy": 1-10,
  "accountability": 1-10,
  "emotional_regulation": 1-10,
  "manipulation_toxicity": 1-10
}}"#,
        policy = persona_policy(persona),
        contract = CONTRACT_VERSION,
        a = person_a,
        b = person_b,
    );

    let user = format!("Transcript:\n\n{}", transcript);

    Prompt { system, user }
}

/// `response_format` requesting schema-constrained output for the contract
pub fn response_format() -> Value {
    let score = json!({ "type": "integer", "minimum": 1, "maximum": 10 });

    let mut properties = serde_json::Map::new();
    properties.insert(
        "winner".to_string(),
        json!({ "type": "string", "enum": ["person_a", "person_b", "tie"] }),
    );
    properties.insert("reasoning".to_string(), json!({ "type": "string" }));
    for field in SCORE_FIELDS {
        properties.insert(field.to_string(), score.clone());
    }

    let mut required = vec!["winner", "reasoning"];
    required.extend(SCORE_FIELDS);

    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "verdict",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            }
        }
    })
}
