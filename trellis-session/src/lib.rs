//! Session handling for Trellis applications.
//!
//! A [`Session`] is a lazily started, request-scoped handle over a
//! [`SessionStore`]. The framework's standard service provider binds a
//! [`MemorySessionStore`] as the default storage.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_session::{MemorySessionStore, Session};
//!
//! let session = Session::new(Arc::new(MemorySessionStore::new()));
//! session.set("user_id", 7).unwrap();
//! assert_eq!(session.get::<i64>("user_id").unwrap(), Some(7));
//! ```

pub mod error;
pub mod memory;
pub mod session;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use memory::MemorySessionStore;
pub use session::Session;
pub use store::{SessionData, SessionStore, generate_session_id};
