//! Connection pooling
//!
//! A bounded set of live connections, handed out as RAII guards.
//!
//! # Example
//!
//! ```ignore
//! use sentio_connection::{ConnectionDescriptor, ConnectionPool, PoolConfig};
//!
//! let descriptor = ConnectionDescriptor::new(endpoint)
//!     .with_pool(PoolConfig::new(2, 10).with_acquire_timeout_ms(5_000));
//!
//! let pool = ConnectionPool::connect(&descriptor, factory).await?;
//! let conn = pool.acquire().await?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod config;
mod guard;
mod pool;
mod stats;
mod status;


pub use config::PoolConfig;
pub use guard::{PooledConnection, ReleaseOutcome};
pub use pool::{ConnectionId, ConnectionPool};
pub(crate) use pool::PoolInner;
pub use stats::PoolStats;
pub use status::PoolStatus;
