//! Session errors.

use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not serialize session value: {0}")]
    Serialization(String),

    #[error("Could not read session value: {0}")]
    Deserialization(String),

    #[error("No session with ID \"{0}\"")]
    NotFound(String),

    /// The id of a started session cannot be changed
    #[error("Cannot change the ID of an active session")]
    AlreadyStarted,
}
