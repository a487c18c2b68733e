//! Pool error taxonomy

use std::time::Duration;

use sentio_core::SentioError;
use thiserror::Error;

/// Errors returned by the connection pool
#[derive(Error, Debug)]
pub enum PoolError {
    /// The descriptor can never produce a working pool. Fatal at startup.
    #[error("Invalid pool configuration: {0}")]
    ConfigInvalid(String),

    /// The backing store was unreachable or rejected the credentials.
    #[error("Failed to connect to backing store: {0}")]
    ConnectFailed(String),

    /// No connection could be produced at all (degraded pool, factory failure).
    #[error("Connection pool unavailable: {0}")]
    PoolUnavailable(String),

    /// Every connection is checked out and none came back in time.
    #[error("Connection pool exhausted: no connection became available within {waited:?}")]
    PoolExhausted { waited: Duration },

    /// A released connection was found broken and has been discarded.
    #[error("Connection is no longer usable and was discarded")]
    ConnectionInvalid,

    /// The pool has been shut down and accepts no new acquisitions.
    #[error("Connection pool is shut down")]
    ShutDown,

    /// The caller's unit of work failed.
    #[error(transparent)]
    Database(#[from] SentioError),
}

impl PoolError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            PoolError::ConnectFailed(_)
            | PoolError::PoolUnavailable(_)
            | PoolError::PoolExhausted { .. }
            | PoolError::ConnectionInvalid => true,
            PoolError::Database(err) => err.is_connection_fault(),
            PoolError::ConfigInvalid(_) | PoolError::ShutDown => false,
        }
    }

    /// Stable machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::ConfigInvalid(_) => "config_invalid",
            PoolError::ConnectFailed(_) => "connect_failed",
            PoolError::PoolUnavailable(_) => "pool_unavailable",
            PoolError::PoolExhausted { .. } => "pool_exhausted",
            PoolError::ConnectionInvalid => "connection_invalid",
            PoolError::ShutDown => "shut_down",
            PoolError::Database(_) => "database",
        }
    }
}

/// Result type alias for pool operations
pub type PoolResult<T> = std::result::Result<T, PoolError>;
