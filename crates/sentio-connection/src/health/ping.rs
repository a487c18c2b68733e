//! Database ping implementation
//!
//! Lightweight round trip used by readiness: a minimal query whose
//! response time is measured.

use std::time::Duration;

use sentio_core::Connection;
use thiserror::Error;
use tokio::time::Instant;

use crate::pool::PoolStatus;

const PING_QUERY: &str = "SELECT 1";

/// Result of a ping operation
pub type PingResult = Result<Duration, PingError>;

/// Why a ping or readiness probe failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PingError {
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Ping query failed: {0}")]
    QueryFailed(String),

    #[error("Ping timed out after {0:?}")]
    Timeout(Duration),

    /// The pool has not reached `Ready`
    #[error("Connection pool is {0}")]
    NotReady(PoolStatus),

    /// No connection could be obtained for the probe
    #[error("No connection available for ping: {0}")]
    Unavailable(String),

    #[error("Connection pool is shut down")]
    ShutDown,
}

/// Ping a database connection and return the round-trip time.
pub async fn ping_database(conn: &dyn Connection) -> PingResult {
    if conn.is_closed() {
        return Err(PingError::ConnectionClosed);
    }

    let start = Instant::now();
    match conn.query(PING_QUERY, &[]).await {
        Ok(_) => Ok(start.elapsed()),
        Err(e) => Err(PingError::QueryFailed(e.to_string())),
    }
}

/// Ping bounded by `timeout`; an elapsed timer is `PingError::Timeout`.
pub async fn ping_with_timeout(conn: &dyn Connection, timeout: Duration) -> PingResult {
    match tokio::time::timeout(timeout, ping_database(conn)).await {
        Ok(result) => result,
        Err(_) => Err(PingError::Timeout(timeout)),
    }
}
