// src/persona/mod.rs
// Persona overlays selectable per session.

pub mod professional;
pub mod sassy;
pub mod zesty;

use serde::{Deserialize, Serialize};

pub use professional::PROFESSIONAL_PERSONA_PROMPT;
pub use sassy::SASSY_PERSONA_PROMPT;
pub use zesty::ZESTY_PERSONA_PROMPT;

use crate::error::ChatError;

/// Closed set of personas. The label is shown to the user, the prompt opens
/// every system instruction verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Persona {
    #[default]
    Sassy,
    Zesty,
    Professional,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Sassy, Persona::Zesty, Persona::Professional];

    /// Returns the system prompt for this persona.
    pub fn prompt(&self) -> &'static str {
        match self {
            Persona::Sassy => SASSY_PERSONA_PROMPT,
            Persona::Zesty => ZESTY_PERSONA_PROMPT,
            Persona::Professional => PROFESSIONAL_PERSONA_PROMPT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Persona::Sassy => "Sassy",
            Persona::Zesty => "Zesty",
            Persona::Professional => "Professional",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Persona {
    type Err = ChatError;

    /// Parse a persona name, case-insensitively. Used by `/persona <name>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sassy" => Ok(Persona::Sassy),
            "zesty" => Ok(Persona::Zesty),
            "professional" | "pro" => Ok(Persona::Professional),
            _ => Err(ChatError::UnknownPersona(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for Persona {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Persona> for String {
    fn from(persona: Persona) -> Self {
        persona.label().to_string()
    }
}
