//! In-memory sessions
//!
//! The REPL owns a single [`Session`]; the HTTP server keeps one per id in a
//! [`SessionStore`]. Each session sits behind its own async mutex, held for
//! a whole turn, so turns within a session never overlap.

mod types;

pub use types::{Conversation, Role, Session, Turn};

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ChatError;
use crate::persona::Persona;

/// Idle timeout used when the configured one does not fit a duration
const FALLBACK_TIMEOUT_MINS: i64 = 60;

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: DateTime<Utc>,
}

/// Sessions keyed by id, dropped after an idle timeout
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    timeout: Duration,
    persona: Persona,
    home_location: String,
    history_limit: usize,
}

impl SessionStore {
    pub fn new(
        persona: Persona,
        home_location: impl Into<String>,
        history_limit: usize,
        timeout_mins: u64,
    ) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            timeout: i64::try_from(timeout_mins)
                .ok()
                .and_then(Duration::try_minutes)
                .unwrap_or_else(|| {
                    warn!(
                        "Session timeout of {} minutes is out of range, using {}",
                        timeout_mins, FALLBACK_TIMEOUT_MINS
                    );
                    Duration::minutes(FALLBACK_TIMEOUT_MINS)
                }),
            persona,
            home_location: home_location.into(),
            history_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.persona,
            config.home_location.clone(),
            config.history_limit,
            config.session_timeout_mins,
        )
    }

    /// Fetch a live session, or create one (with the given id if any)
    pub fn get_or_create(&self, id: Option<Uuid>) -> Arc<Mutex<Session>> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut entries, now);

        let id = id.unwrap_or_else(Uuid::new_v4);
        let entry = entries.entry(id).or_insert_with(|| {
            info!("Created session {}", id);
            SessionEntry {
                session: Arc::new(Mutex::new(Session::with_id(
                    id,
                    self.persona,
                    self.home_location.clone(),
                    self.history_limit,
                ))),
                last_seen: now,
            }
        });
        entry.last_seen = now;
        entry.session.clone()
    }

    /// Fetch an existing live session
    pub fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, ChatError> {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut entries, now);

        let entry = entries.get_mut(&id).ok_or(ChatError::SessionNotFound(id))?;
        entry.last_seen = now;
        Ok(entry.session.clone())
    }

    /// Drop a session
    pub fn remove(&self, id: Uuid) -> Result<(), ChatError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .remove(&id)
            .map(|_| info!("Removed session {}", id))
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut entries, now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, entries: &mut HashMap<Uuid, SessionEntry>, now: DateTime<Utc>) {
        let timeout = self.timeout;
        entries.retain(|id, entry| {
            let live = now - entry.last_seen < timeout;
            if !live {
                debug!("Session {} expired", id);
            }
            live
        });
    }
}
