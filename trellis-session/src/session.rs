//! Request-scoped session handle.

use crate::error::{SessionError, SessionResult};
use crate::store::{SessionData, SessionStore, generate_session_id};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A session bound to a store.
///
/// The session starts lazily: the first read or write creates it in the
/// store unless [`resume`](Session::resume) picked up an existing one.
pub struct Session {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<SessionData>>,
    ttl: Option<Duration>,
}

impl Session {
    /// Container key the session is aliased under.
    pub const NAME: &'static str = "trellis_session::Session";

    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn is_started(&self) -> bool {
        self.current.read().is_some()
    }

    /// Start a new session if none is active and return its id.
    pub fn start(&self) -> SessionResult<String> {
        if let Some(session) = self.current.read().as_ref() {
            return Ok(session.id.clone());
        }

        let session = self.store.create(self.ttl)?;
        let id = session.id.clone();
        *self.current.write() = Some(session);
        Ok(id)
    }

    /// Continue an existing session by id.
    pub fn resume(&self, session_id: &str) -> SessionResult<()> {
        if self.is_started() {
            return Err(SessionError::AlreadyStarted);
        }

        let mut session = self
            .store
            .get(session_id)?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.touch();
        *self.current.write() = Some(session);
        Ok(())
    }

    pub fn id(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.id.clone())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>> {
        self.with_data(|session| session.get(key))
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()> {
        self.with_data_mut(|session| session.set(key, value))
    }

    pub fn has(&self, key: &str) -> SessionResult<bool> {
        self.with_data(|session| Ok(session.contains(key)))
    }

    pub fn remove(&self, key: &str) -> SessionResult<Option<serde_json::Value>> {
        self.with_data_mut(|session| Ok(session.remove(key)))
    }

    pub fn all(&self) -> SessionResult<BTreeMap<String, serde_json::Value>> {
        self.with_data(|session| Ok(session.data.clone()))
    }

    pub fn clear(&self) -> SessionResult<()> {
        self.with_data_mut(|session| {
            session.data.clear();
            Ok(())
        })
    }

    /// Persist the current data to the store.
    pub fn save(&self) -> SessionResult<()> {
        match self.current.read().as_ref() {
            Some(session) => self.store.save(session),
            None => Ok(()),
        }
    }

    /// Move the data to a fresh id, optionally deleting the old record.
    pub fn migrate(&self, destroy: bool) -> SessionResult<String> {
        self.start()?;

        let mut current = self.current.write();
        let Some(session) = current.as_mut() else {
            return Err(SessionError::NotFound("no active session".to_string()));
        };

        let old_id = std::mem::replace(&mut session.id, generate_session_id());
        if destroy {
            self.store.delete(&old_id)?;
        }
        self.store.save(session)?;

        debug!(old_id = %old_id, new_id = %session.id, destroy, "Session migrated");
        Ok(session.id.clone())
    }

    /// Clear all data and move to a fresh id, deleting the old record.
    pub fn invalidate(&self) -> SessionResult<String> {
        self.clear()?;
        self.migrate(true)
    }

    fn with_data<R>(&self, f: impl FnOnce(&SessionData) -> SessionResult<R>) -> SessionResult<R> {
        self.start()?;
        match self.current.read().as_ref() {
            Some(session) => f(session),
            None => Err(SessionError::NotFound("no active session".to_string())),
        }
    }

    fn with_data_mut<R>(
        &self,
        f: impl FnOnce(&mut SessionData) -> SessionResult<R>,
    ) -> SessionResult<R> {
        self.start()?;
        match self.current.write().as_mut() {
            Some(session) => f(session),
            None => Err(SessionError::NotFound("no active session".to_string())),
        }
    }
}
