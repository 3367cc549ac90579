//! Error types for the grounding lookups, the model provider and the chat loop.
//!
//! Grounding errors never escape their fetcher: they are folded into a
//! [`FetchOutcome::Fallback`](crate::grounding::FetchOutcome) at the boundary.
//! Only [`ChatError`] is returned to callers of the chat engine.

use uuid::Uuid;

/// Failures inside a grounding lookup (geocode, timezone, weather, search).
#[derive(Debug, thiserror::Error)]
pub enum GroundingError {
    #[error("could not resolve location: {0}")]
    Resolution(String),

    #[error("{service} returned HTTP {status}")]
    Fetch { service: &'static str, status: u16 },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from {service}: {detail}")]
    Decode { service: &'static str, detail: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Failures opening a model stream. Mid-stream failures arrive as
/// [`StreamEvent::Error`](crate::provider::StreamEvent) instead.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the REPL or HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("unknown persona: {0}")]
    UnknownPersona(String),

    #[error("configuration error: {0}")]
    Config(String),
}
