//! Error types for Sentio

use thiserror::Error;

/// Core error type for storage operations
#[derive(Error, Debug)]
pub enum SentioError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl SentioError {
    /// Whether this error leaves the connection it happened on in an unknown state.
    ///
    /// Query errors (bad SQL, constraint violations) are reported by a healthy
    /// server and do not affect the connection; everything transport related does.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            SentioError::Connection(_)
                | SentioError::Io(_)
                | SentioError::Timeout(_)
                | SentioError::Cancelled
        )
    }
}

/// Result type alias for Sentio operations
pub type Result<T> = std::result::Result<T, SentioError>;
