//! Error types for the resus_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for resus_core operations
///
/// Nothing here is fatal mid-session: invalid transitions and missing ids
/// are rejected as no-ops, and persistence failures degrade to in-memory
/// state only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was requested in a protocol state that forbids it
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),

    /// An operation required a live session and there is none
    #[error("No live session")]
    NoLiveSession,

    /// The targeted session does not exist
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    /// The targeted event does not exist in the targeted scope
    #[error("Event {0} not found")]
    EventNotFound(Uuid),

    /// An edit attempted to change an event's variant
    #[error("Edit would change the event's variant")]
    VariantMismatch,

    /// Generic error
    #[error("{0}")]
    Other(String),
}
