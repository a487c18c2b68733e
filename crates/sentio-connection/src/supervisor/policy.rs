//! Retry policy and the pool's retry bookkeeping

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::BackoffStrategy;
use crate::error::PoolError;

/// How the supervisor spaces out re-initialization attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay schedule
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// Attempts after which the delay stays at the cap
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    10
}

impl RetryPolicy {
    pub fn new(backoff: BackoffStrategy, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
        }
    }

    /// Delay before retrying after `failures` consecutive failed attempts.
    ///
    /// The first retry waits the initial delay. Once the ceiling is reached
    /// retries continue indefinitely at the maximum delay.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures > self.max_attempts {
            return self.backoff.max_delay();
        }
        self.backoff.calculate_delay(failures.saturating_sub(1))
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_attempts == 0 {
            return Err(PoolError::ConfigInvalid(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(BackoffStrategy::default(), default_max_attempts())
    }
}

/// Retry bookkeeping kept in the pool state
#[derive(Debug, Clone, Default)]
pub(crate) struct RetryState {
    /// Consecutive failed initialization attempts
    pub(crate) attempts: u32,
    /// When the supervisor will next try, if a retry is scheduled
    pub(crate) next_retry_at: Option<Instant>,
}

impl RetryState {
    pub(crate) fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        self.next_retry_at = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
