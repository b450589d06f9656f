//! Shared primitive types used across the entire session engine.

/// A scheduler tick counter. One tick = one call to `SessionEngine::tick`.
pub type Tick = u64;

/// Session-relative milliseconds. Only advances while the session is running.
pub type Millis = u64;

/// Stable identifier of an email template in the catalog.
pub type EmailId = String;

/// Identifier of a choice, unique within its template.
pub type ChoiceId = u32;

/// The canonical session identifier.
pub type SessionId = String;

/// Generate a fresh session id.
pub fn new_session_id() -> SessionId {
    format!("session-{}", uuid::Uuid::new_v4())
}
