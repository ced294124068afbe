//! Persona selection
//!
//! A persona is the tone/policy template the model uses to phrase its
//! reasoning. The set is closed; unknown keys resolve to [`Persona::Mediator`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Calm, balanced, neutral
    #[default]
    Mediator,
    /// Blunt courtroom authority
    Judge,
    /// Playful and dramatic, ends with a joke
    Comedic,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Mediator, Persona::Judge, Persona::Comedic];

    /// Total mapping from a persona key to a persona
    ///
    /// Keys are matched exactly; anything else (including different casing)
    /// falls through to the mediator.
    pub fn resolve(key: &str) -> Self {
        match key {
            "mediator" => Persona::Mediator,
            "judge" => Persona::Judge,
            "comedic" => Persona::Comedic,
            _ => Persona::Mediator,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Mediator => "mediator",
            Persona::Judge => "judge",
            Persona::Comedic => "comedic",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
