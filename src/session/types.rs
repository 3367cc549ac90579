//! Session types: turns, the bounded conversation, and the session itself

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::persona::Persona;
use crate::provider::{Message, MessageRole};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: match self.role {
                Role::User => MessageRole::User,
                Role::Assistant => MessageRole::Assistant,
            },
            content: self.content.clone(),
        }
    }
}

/// Chronological turns, front-truncated to the most recent `limit`
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl Conversation {
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Append a turn, dropping the oldest ones past the limit
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// History in provider form, oldest first
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(Turn::to_message).collect()
    }
}

/// One user's chat state
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    /// Applied from the next turn when changed
    pub persona: Persona,
    pub home_location: String,
    pub conversation: Conversation,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(persona: Persona, home_location: impl Into<String>, history_limit: usize) -> Self {
        Self::with_id(Uuid::new_v4(), persona, home_location, history_limit)
    }

    pub fn with_id(
        id: Uuid,
        persona: Persona,
        home_location: impl Into<String>,
        history_limit: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            persona,
            home_location: home_location.into(),
            conversation: Conversation::new(history_limit),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Hard reset: forget the conversation, keep persona and location
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}
