//! Pool statistics types

use serde::{Deserialize, Serialize};

use super::PoolStatus;

/// Point-in-time snapshot of a connection pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    status: PoolStatus,
    /// Connections available in the pool
    idle: usize,
    /// Connections currently owned by callers
    checked_out: usize,
    /// Handshakes in progress
    opening: usize,
    /// Callers waiting for a connection
    waiting: usize,
    min_size: usize,
    max_size: usize,
    /// Consecutive failed initialization attempts
    retry_attempts: u32,
    /// Milliseconds until the supervisor's next attempt, if one is scheduled
    next_retry_in_ms: Option<u64>,
    last_error: Option<String>,
    shut_down: bool,
}

impl PoolStats {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        status: PoolStatus,
        idle: usize,
        checked_out: usize,
        opening: usize,
        waiting: usize,
        min_size: usize,
        max_size: usize,
        retry_attempts: u32,
        next_retry_in_ms: Option<u64>,
        last_error: Option<String>,
        shut_down: bool,
    ) -> Self {
        Self {
            status,
            idle,
            checked_out,
            opening,
            waiting,
            min_size,
            max_size,
            retry_attempts,
            next_retry_in_ms,
            last_error,
            shut_down,
        }
    }

    pub fn status(&self) -> PoolStatus {
        self.status
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn checked_out(&self) -> usize {
        self.checked_out
    }

    pub fn opening(&self) -> usize {
        self.opening
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn next_retry_in_ms(&self) -> Option<u64> {
        self.next_retry_in_ms
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Open connections, idle or checked out
    pub fn total(&self) -> usize {
        self.idle + self.checked_out
    }

    /// Fraction of open connections currently checked out (0.0 to 1.0)
    ///
    /// Returns 0.0 if no connection is open.
    pub fn utilization(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.checked_out as f64 / total as f64
        }
    }

    /// Every slot is in use or being opened
    pub fn is_full(&self) -> bool {
        self.idle == 0 && self.checked_out + self.opening >= self.max_size
    }

    pub fn is_below_min(&self) -> bool {
        self.total() + self.opening < self.min_size
    }
}
