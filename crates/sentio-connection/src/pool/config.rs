//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Sizing and timeouts for a connection pool
///
/// Construction never panics; `validate` rejects impossible combinations
/// with `PoolError::ConfigInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections opened by initialization and kept by the supervisor
    min_size: usize,
    /// Hard cap on idle + checked out + opening connections
    max_size: usize,
    /// Bound on a single connection handshake
    connect_timeout_ms: u64,
    /// How long `acquire` waits when every connection is checked out
    acquire_timeout_ms: u64,
    /// Bound on the readiness round trip
    ping_timeout_ms: u64,
}

impl PoolConfig {
    /// Create a pool configuration with the given min and max sizes
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self {
            min_size,
            max_size,
            connect_timeout_ms: 5_000,
            acquire_timeout_ms: 10_000,
            ping_timeout_ms: 2_000,
        }
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    pub fn with_ping_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.ping_timeout_ms = timeout_ms;
        self
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Reject configurations that can never produce a working pool
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::ConfigInvalid(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(PoolError::ConfigInvalid(format!(
                "min_size ({}) cannot exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("acquire_timeout_ms", self.acquire_timeout_ms),
            ("ping_timeout_ms", self.ping_timeout_ms),
        ] {
            if value == 0 {
                return Err(PoolError::ConfigInvalid(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    /// Defaults:
    /// - min_size: 2
    /// - max_size: 10
    /// - connect_timeout: 5 seconds
    /// - acquire_timeout: 10 seconds
    /// - ping_timeout: 2 seconds
    fn default() -> Self {
        Self::new(2, 10)
    }
}
