//! Scoped acquisition: one connection for one unit of work

use std::time::Duration;

use futures::future::BoxFuture;
use sentio_core::{Connection, SentioError};

use crate::error::{PoolError, PoolResult};
use crate::pool::{ConnectionPool, PooledConnection};

impl ConnectionPool {
    /// Run `work` on a pooled connection and release it afterwards.
    ///
    /// The connection goes back on every exit path. It is discarded rather
    /// than recycled when the work reports a connection-level fault, or when
    /// the work never finished (panic, or this future was dropped).
    ///
    /// ```ignore
    /// let count = pool
    ///     .with_connection(|conn| {
    ///         Box::pin(async move {
    ///             let result = conn.query("SELECT count(*) FROM predictions", &[]).await?;
    ///             Ok(result.row_count())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_connection<T, F>(&self, work: F) -> PoolResult<T>
    where
        F: for<'c> FnOnce(&'c dyn Connection) -> BoxFuture<'c, sentio_core::Result<T>>,
    {
        let mut connection = self.acquire().await?;
        connection.begin_work();
        let outcome = work(&*connection).await;
        connection.finish_work();
        settle(&mut connection, outcome)
    }

    /// Like `with_connection`, with the unit of work bounded by `timeout`.
    ///
    /// A timed-out connection is discarded since its session state is unknown.
    pub async fn with_connection_timeout<T, F>(&self, timeout: Duration, work: F) -> PoolResult<T>
    where
        F: for<'c> FnOnce(&'c dyn Connection) -> BoxFuture<'c, sentio_core::Result<T>>,
    {
        let mut connection = self.acquire().await?;
        connection.begin_work();
        let outcome = match tokio::time::timeout(timeout, work(&*connection)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(connection_id = %connection.id(), ?timeout, "unit of work timed out");
                return Err(PoolError::Database(SentioError::Timeout(format!(
                    "unit of work exceeded {timeout:?}"
                ))));
            }
        };
        connection.finish_work();
        settle(&mut connection, outcome)
    }
}

fn settle<T>(connection: &mut PooledConnection, outcome: sentio_core::Result<T>) -> PoolResult<T> {
    match outcome {
        Ok(value) => {
            if !connection.is_usable() {
                tracing::debug!(connection_id = %connection.id(), "connection unusable after successful work");
                connection.mark_broken();
            }
            Ok(value)
        }
        Err(err) => {
            if err.is_connection_fault() || !connection.is_usable() {
                tracing::warn!(connection_id = %connection.id(), error = %err, "connection fault during unit of work");
                connection.mark_broken();
            }
            Err(PoolError::Database(err))
        }
    }
}
