//! Sentio Connection - Resilient connection pooling
//!
//! This crate owns the bounded set of connections to the backing store and
//! keeps it healthy:
//!
//! - `ConnectionPool` hands out connections and reclaims them
//! - a background retry supervisor re-populates the pool with exponential
//!   backoff whenever it is degraded or below its minimum size
//! - `ConnectionPool::with_connection` scopes a connection to one unit of work
//! - `HealthReporter` answers liveness and readiness separately
//!
//! The pool never takes the process down: the store being unreachable at
//! startup leaves the pool `Degraded` and the supervisor retrying.

mod descriptor;
mod error;
pub mod health;
pub mod pool;
mod scope;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use descriptor::ConnectionDescriptor;
pub use error::{PoolError, PoolResult};
pub use health::{
    HealthReporter, HealthStatus, HealthThresholds, LivenessReport, PingError, PingResult,
    ReadinessReport, ReadinessState, ping_database, ping_with_timeout,
};
pub use pool::{
    ConnectionId, ConnectionPool, PoolConfig, PoolStats, PoolStatus, PooledConnection,
    ReleaseOutcome,
};
pub use supervisor::{BackoffStrategy, RetryPolicy};
