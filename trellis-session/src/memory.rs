//! In-memory session store.

use crate::error::SessionResult;
use crate::store::{SessionData, SessionStore, generate_session_id};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Keeps sessions in a process-local map. Used for CLI runs and tests.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    default_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, ttl: Option<Duration>) -> SessionResult<SessionData> {
        let session = SessionData::new(generate_session_id(), ttl.unwrap_or(self.default_ttl));
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());

        debug!(session_id = %session.id, "Session created");
        Ok(session)
    }

    fn get(&self, session_id: &str) -> SessionResult<Option<SessionData>> {
        let sessions = self.sessions.read();
        let session = sessions
            .get(session_id)
            .filter(|session| !session.is_expired())
            .cloned();

        trace!(session_id, found = session.is_some(), "Session lookup");
        Ok(session)
    }

    fn save(&self, session: &SessionData) -> SessionResult<()> {
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.sessions.write().remove(session_id);
        debug!(session_id, "Session deleted");
        Ok(())
    }

    fn clear_all(&self) -> SessionResult<()> {
        self.sessions.write().clear();
        Ok(())
    }

    fn count(&self) -> SessionResult<usize> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|session| !session.is_expired())
            .count())
    }

    fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}
