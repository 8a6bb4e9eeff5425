//! Session data and the storage trait.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Session data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    pub data: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: BTreeMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> SessionResult<Option<T>> {
        self.data
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| SessionError::Deserialization(e.to_string()))
            })
            .transpose()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
    }
}

/// Storage backend for sessions.
///
/// The standard service provider binds an in-memory store under the
/// `sessionStorage` key as an `Arc<dyn SessionStore>`.
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session.
    fn create(&self, ttl: Option<Duration>) -> SessionResult<SessionData>;

    /// `Ok(None)` when the session is unknown or expired.
    fn get(&self, session_id: &str) -> SessionResult<Option<SessionData>>;

    fn save(&self, session: &SessionData) -> SessionResult<()>;

    fn delete(&self, session_id: &str) -> SessionResult<()>;

    fn exists(&self, session_id: &str) -> SessionResult<bool> {
        Ok(self.get(session_id)?.is_some())
    }

    fn clear_all(&self) -> SessionResult<()>;

    fn count(&self) -> SessionResult<usize>;

    /// Remove expired sessions, returning how many were dropped.
    fn cleanup_expired(&self) -> SessionResult<usize>;
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
