//! Connection trait

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

/// A single physical connection to the backing store
///
/// Implementations are owned by exactly one holder at a time; the pool never
/// shares a connection between two callers.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql", "mock")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE/DDL)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Cheap, non-blocking check that the connection can be handed out again.
    ///
    /// Drivers that can detect a poisoned session (an aborted transaction, a
    /// half-read response) should override this. The default only looks at
    /// the closed flag.
    fn is_usable(&self) -> bool {
        !self.is_closed()
    }
}
