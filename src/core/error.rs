//! Custom error types for Tandem
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Tandem operations
#[derive(Error, Debug)]
pub enum TandemError {
    /// Assistants API returned a non-success status
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// Entity absent on the remote service (tolerated during create-or-retrieve)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A multiplexed work item panicked or was torn down unexpectedly
    #[error("Work error: {0}")]
    Work(String),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The event sink hung up before the loop finished
    #[error("Event channel closed")]
    EventChannelClosed,

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Tandem operations
pub type Result<T> = std::result::Result<T, TandemError>;

impl TandemError {
    /// Create a service error
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a work error
    pub fn work(msg: impl Into<String>) -> Self {
        Self::Work(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is the tolerated "entity absent" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
