//! Chat engine: drives one grounded turn end to end
//!
//! utterance → intent → grounding (concurrent lookups) → system instruction
//! → model stream → committed assistant turn.
//!
//! Every path after validation ends with exactly one assistant turn in the
//! conversation, even when the stream fails or the caller cancels.

mod types;

pub use types::{ChatEvent, TurnOutcome, TurnState, TurnStatus};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::grounding::Grounder;
use crate::intent;
use crate::prompt::{MentionPolicy, build_system_instruction};
use crate::provider::{ChatRequest, GroqProvider, Provider, StreamEvent};
use crate::session::{Session, Turn};

/// Longest accepted utterance, in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Channel depth for turn events
pub const STREAM_EVENT_BUFFER: usize = 100;

/// Committed when the stream yields no text
pub const FAILURE_MESSAGE: &str = "The link is hitting its limits! Wait 30 seconds.";

/// Committed when the user stops a reply before any text arrived
pub const STOPPED_MESSAGE: &str = "(stopped)";

/// Model parameters and prompt policy
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub mention_policy: MentionPolicy,
    /// Longest wait for the stream to open or for its next event
    pub idle_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: (config.max_tokens > 0).then_some(config.max_tokens),
            mention_policy: config.mention_policy,
            idle_timeout: Duration::from_secs(config.llm_idle_timeout_secs.max(1)),
        }
    }
}

pub struct ChatEngine {
    provider: Arc<dyn Provider>,
    grounder: Arc<Grounder>,
    settings: EngineSettings,
}

impl ChatEngine {
    pub fn new(provider: Arc<dyn Provider>, grounder: Arc<Grounder>, settings: EngineSettings) -> Self {
        Self {
            provider,
            grounder,
            settings,
        }
    }

    /// Groq provider plus HTTP-backed grounding, all from config
    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        let provider = GroqProvider::from_config(config).map_err(|e| ChatError::Config(e.to_string()))?;
        let grounder = Grounder::from_config(config).map_err(|e| ChatError::Config(e.to_string()))?;
        Ok(Self::new(
            Arc::new(provider),
            Arc::new(grounder),
            EngineSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run one turn
    ///
    /// Events go to `events` as they happen; the sender is dropped when the
    /// turn returns, so a renderer can simply drain the receiver. A closed
    /// receiver or a fired `cancel` token stops consuming the model stream;
    /// whatever text arrived is still committed. A stream that stays silent
    /// longer than the idle timeout fails the turn the same way.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        utterance: &str,
        events: mpsc::Sender<ChatEvent>,
        cancel: Option<CancellationToken>,
    ) -> Result<TurnOutcome, ChatError> {
        let utterance = validate(utterance)?;
        let cancel = cancel.unwrap_or_default();

        // Idle → Sent. Persona and location are fixed for the rest of the turn.
        let persona = session.persona;
        let location = session.home_location.clone();
        let history = session.conversation.to_messages();
        session.conversation.push(Turn::user(utterance));
        session.touch();
        let mut state = TurnState::Sent;
        debug!("Session {} turn state: {:?}", session.id, state);

        let intent = intent::classify(utterance);
        let grounding = self.grounder.gather(&location, utterance, &intent).await;
        let _ = events
            .send(ChatEvent::Grounding {
                intent,
                grounding: grounding.clone(),
            })
            .await;

        let request = ChatRequest {
            model: self.settings.model.clone(),
            system: build_system_instruction(persona, &grounding, utterance, self.settings.mention_policy),
            messages: history,
            input: utterance.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut reply = String::new();
        let mut chunks = 0usize;

        let idle = self.settings.idle_timeout;
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = tokio::time::timeout(idle, self.provider.create_stream(request)) => Some(opened),
        };

        let status = match opened {
            None => {
                info!("Turn cancelled before the stream opened");
                TurnStatus::Cancelled
            }
            Some(Err(_)) => {
                error!("{} stream did not open within {:?}", self.provider.name(), idle);
                TurnStatus::Failed
            }
            Some(Ok(Err(e))) => {
                error!("{} stream failed to open: {}", self.provider.name(), e);
                TurnStatus::Failed
            }
            Some(Ok(Ok(mut rx))) => {
                state = TurnState::Streaming;
                debug!("Session {} turn state: {:?}", session.id, state);

                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!("Turn cancelled after {} chunks", chunks);
                            break TurnStatus::Cancelled;
                        }
                        event = tokio::time::timeout(idle, rx.recv()) => match event {
                            Err(_) => {
                                error!("Model stream idle for {:?} after {} chunks", idle, chunks);
                                break TurnStatus::Failed;
                            }
                            Ok(Some(StreamEvent::TextDelta(delta))) => {
                                reply.push_str(&delta);
                                chunks += 1;
                                if events.send(ChatEvent::TextDelta { delta }).await.is_err() {
                                    info!("Renderer went away after {} chunks", chunks);
                                    break TurnStatus::Cancelled;
                                }
                            }
                            Ok(Some(StreamEvent::Done) | None) => break TurnStatus::Completed,
                            Ok(Some(StreamEvent::Error(message))) => {
                                error!("Model stream failed after {} chunks: {}", chunks, message);
                                break TurnStatus::Failed;
                            }
                        }
                    }
                }
            }
        };

        // → Completed: commit exactly one assistant turn
        let (reply, status) = match (reply.trim().is_empty(), status) {
            (false, status) => (reply, status),
            (true, TurnStatus::Cancelled) => (STOPPED_MESSAGE.to_string(), TurnStatus::Cancelled),
            (true, status) => {
                if status == TurnStatus::Completed {
                    warn!("Model stream ended without text");
                }
                let _ = events
                    .send(ChatEvent::Error {
                        message: FAILURE_MESSAGE.to_string(),
                    })
                    .await;
                (FAILURE_MESSAGE.to_string(), TurnStatus::Failed)
            }
        };

        session.conversation.push(Turn::assistant(reply.clone()));
        session.touch();
        state = TurnState::Completed;
        debug!("Session {} turn state: {:?}", session.id, state);

        let _ = events.send(ChatEvent::Done { status }).await;

        info!(
            "Turn {:?}: persona={}, weather={}, search={}, chunks={}, history={}",
            status,
            persona,
            intent.needs_weather,
            intent.needs_search,
            chunks,
            session.conversation.len()
        );

        Ok(TurnOutcome {
            reply,
            intent,
            grounding,
            status,
            chunks,
        })
    }
}

/// Trim and bound-check an utterance
pub fn validate(utterance: &str) -> Result<&str, ChatError> {
    let trimmed = utterance.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(trimmed)
}
