//! zesty: persona chat grounded in live time, weather and web search
//!
//! Each turn classifies the user's message, fetches the facts it needs,
//! injects them into the system instruction and streams the model's reply
//! into a bounded conversation.

pub mod chat;
pub mod config;
pub mod error;
pub mod grounding;
pub mod intent;
pub mod persona;
pub mod prompt;
pub mod provider;
pub mod repl;
pub mod server;
pub mod session;

pub use chat::{ChatEngine, ChatEvent, EngineSettings, TurnOutcome, TurnStatus};
pub use config::Config;
pub use error::{ChatError, GroundingError, ProviderError};
pub use persona::Persona;
pub use session::{Session, SessionStore};
