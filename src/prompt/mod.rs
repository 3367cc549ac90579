// src/prompt/mod.rs
// System instruction assembly and the grounding mention policy

pub mod builder;

use serde::{Deserialize, Serialize};

pub use builder::build_system_instruction;

/// How freely the model may bring up time, weather and location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MentionPolicy {
    /// Only when the user's message asks for them
    #[default]
    OnlyWhenAsked,
    /// May be woven into any reply
    Proactive,
}

impl MentionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionPolicy::OnlyWhenAsked => "only-when-asked",
            MentionPolicy::Proactive => "proactive",
        }
    }
}

impl std::fmt::Display for MentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "only-when-asked" | "quiet" => Ok(MentionPolicy::OnlyWhenAsked),
            "proactive" => Ok(MentionPolicy::Proactive),
            other => Err(format!("unknown mention policy: {}", other)),
        }
    }
}
