//! Immutable connection descriptor supplied at pool construction

use sentio_core::Endpoint;
use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::pool::PoolConfig;
use crate::supervisor::RetryPolicy;

/// Everything the pool needs to know about the backing store
///
/// Built once from process configuration and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Address and credentials, consumed by the connection factory
    pub endpoint: Endpoint,
    /// Pool sizing and timeouts
    #[serde(default)]
    pub pool: PoolConfig,
    /// Background retry schedule
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ConnectionDescriptor {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reject descriptors that can never produce a working pool
    pub fn validate(&self) -> Result<(), PoolError> {
        self.endpoint
            .validate()
            .map_err(|e| PoolError::ConfigInvalid(e.to_string()))?;
        self.pool.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}
