//! Error types for chatinsights-core

use thiserror::Error;

/// Main error type for the chatinsights-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A jid that is neither a user, a group nor a broadcast list
    #[error("identity error: {0}")]
    Identity(String),

    /// An event record of a kind the engine cannot route
    #[error("unrecognized event kind: {0}")]
    EventKind(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for chatinsights-core
pub type Result<T> = std::result::Result<T, Error>;
