//! Checked-out connection guard

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use sentio_core::Connection;
use tokio::time::Instant;

use super::pool::{ConnectionId, PoolInner};

/// What the pool should do with a connection coming back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    Recycle,
    Discard,
}

/// What happened to a released connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Back in the idle set
    Recycled,
    /// Broken; closed and its slot freed
    Discarded,
    /// The pool was shut down; closed
    Closed,
    /// The pool did not consider it checked out (double release)
    Ignored,
}

/// A connection borrowed from the pool
///
/// Owned by exactly one caller. Dropping the guard returns the connection
/// on every exit path; a connection marked broken, or dropped while an
/// operation was still in flight, is discarded instead of recycled.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    id: ConnectionId,
    connection: Option<Box<dyn Connection>>,
    created_at: Instant,
    broken: bool,
    in_flight: bool,
}

impl PooledConnection {
    pub(crate) fn new(
        pool: Arc<PoolInner>,
        id: ConnectionId,
        connection: Box<dyn Connection>,
        created_at: Instant,
    ) -> Self {
        Self {
            pool,
            id,
            connection: Some(connection),
            created_at,
            broken: false,
            in_flight: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Time since the physical connection was opened
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Discard this connection on release instead of recycling it
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub(crate) fn begin_work(&mut self) {
        self.in_flight = true;
    }

    pub(crate) fn finish_work(&mut self) {
        self.in_flight = false;
    }

    /// Return the connection now and report what the pool did with it
    pub fn release(mut self) -> ReleaseOutcome {
        self.give_back().unwrap_or(ReleaseOutcome::Ignored)
    }

    fn give_back(&mut self) -> Option<ReleaseOutcome> {
        let connection = self.connection.take()?;
        if self.in_flight {
            tracing::warn!(connection_id = %self.id, "connection released with an operation in flight");
        }
        let disposition = if self.broken || self.in_flight {
            Disposition::Discard
        } else {
            Disposition::Recycle
        };
        Some(
            self.pool
                .return_connection(self.id, connection, self.created_at, disposition),
        )
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_deref().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let _ = self.give_back();
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("broken", &self.broken)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
