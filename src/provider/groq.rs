//! Groq provider (OpenAI-compatible Chat Completions API)
//!
//! Any endpoint that speaks `POST {base}/chat/completions` with `stream: true`
//! works here; the base URL comes from config.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{ChatRequest, MessageRole, Provider, STREAM_BUFFER, SseDecoder, StreamEvent};
use crate::config::Config;
use crate::error::ProviderError;

/// Bound on TCP/TLS setup; silence mid-stream is bounded by the engine's
/// idle timeout instead.
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct GroqProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl GroqProvider {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            client: HttpClient::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let api_key = config
            .groq_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Unavailable("GROQ_API_KEY not set".into()))?;
        Ok(Self::new(api_key, &config.llm_base_url))
    }

    /// Build the wire body: system, history, current input
    fn build_body(request: &ChatRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 2);

        messages.push(ChatMessage {
            role: MessageRole::System.as_str(),
            content: request.system.clone(),
        });

        for msg in &request.messages {
            messages.push(ChatMessage {
                role: msg.role.as_str(),
                content: msg.content.clone(),
            });
        }

        messages.push(ChatMessage {
            role: MessageRole::User.as_str(),
            content: request.input.clone(),
        });

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        }
    }

    /// Read the SSE body and forward text deltas until `[DONE]`
    async fn process_sse_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    error!("Model stream broke: {}", e);
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return;
                }
            };

            for frame in decoder.push(&chunk) {
                if frame.is_done() {
                    let _ = tx.send(StreamEvent::Done).await;
                    return;
                }

                let Some(chunk_data) = frame.try_parse::<ChatStreamChunk>() else {
                    debug!("Skipping unparseable frame: {}", frame.preview());
                    continue;
                };

                if let Some(err) = chunk_data.error {
                    error!("Model stream error: {}", err.message);
                    let _ = tx.send(StreamEvent::Error(err.message)).await;
                    return;
                }

                for choice in chunk_data.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        // Receiver gone: the turn stopped consuming
                        if tx.send(StreamEvent::TextDelta(content)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn create_stream(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, ProviderError> {
        let body = Self::build_body(&request);
        debug!(
            "Opening {} stream: model={}, history={}",
            self.name(),
            body.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {})", e));
            return Err(ProviderError::Api { status, body });
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(Self::process_sse_stream(response, tx));

        Ok(rx)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
