//! Offset Tracker Error Hierarchy
//!
//! Startup-fatal configuration failures, coordination-service failures and
//! payload decoding failures. Only the first class aborts the module; the
//! others are logged by the watch tree and confined to a single node.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source or deserialization failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Startup-fatal validation failure for a single configuration field
    #[error("Invalid configuration `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Coordination-service connection, session and node failures
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Node payload could not be decoded
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Module is already started")]
    AlreadyStarted,

    #[error("Module has not been started")]
    NotStarted,

    #[error("{0}")]
    RetryTaskFailed(String),

    #[error("Task timed out")]
    RetryTimeout,

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Error {
    pub(crate) fn invalid_config(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// The node does not exist (deleted, or never created)
    #[error("Node does not exist: {path}")]
    NoNode { path: String },

    /// Session was expired by the ensemble; every watch is gone
    #[error("Session expired")]
    SessionExpired,

    /// The client connection has been closed locally
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Errors surfaced by the underlying client implementation
    #[error("Coordination backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload carries no topic name")]
    MissingTopic,
}
