//! Model provider abstraction
//!
//! A provider opens one streaming chat completion and hands back a finite
//! `mpsc::Receiver<StreamEvent>`. The stream is not restartable: the caller
//! stops consuming to cancel, and a dropped receiver ends the producer task.

mod groq;
pub mod sse;

pub use groq::GroqProvider;
pub use sse::{SseDecoder, SseFrame};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;

/// Channel depth between the provider task and the turn loop
pub const STREAM_BUFFER: usize = 100;

/// Unified provider trait for chat-completion backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a streaming chat completion
    async fn create_stream(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One completion request
///
/// Sent as: system instruction, then `messages` (history), then `input`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub input: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Events from a completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text delta, render immediately
    TextDelta(String),
    /// Stream ended normally
    Done,
    /// Stream failed; no further events follow
    Error(String),
}
