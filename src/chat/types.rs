//! Turn events and outcomes

use serde::Serialize;

use crate::grounding::GroundingContext;
use crate::intent::Intent;

/// Where a turn is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    /// User turn recorded, grounding in flight
    Sent,
    /// Model stream open
    Streaming,
    /// Reply committed
    Completed,
}

/// How the model stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Stream reached its end with text
    Completed,
    /// Stream could not open, broke, or produced no text
    Failed,
    /// Caller stopped consuming
    Cancelled,
}

/// Events sent to the renderer while a turn runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// Facts gathered for this turn
    #[serde(rename = "grounding")]
    Grounding {
        intent: Intent,
        grounding: GroundingContext,
    },

    /// Streaming text from the model
    #[serde(rename = "text_delta")]
    TextDelta { delta: String },

    /// Turn failed; `message` is what the user should see
    #[serde(rename = "error")]
    Error { message: String },

    /// Turn committed
    #[serde(rename = "done")]
    Done { status: TurnStatus },
}

/// Result of one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Committed assistant content
    pub reply: String,
    pub intent: Intent,
    pub grounding: GroundingContext,
    pub status: TurnStatus,
    /// Number of text deltas received
    pub chunks: usize,
}
