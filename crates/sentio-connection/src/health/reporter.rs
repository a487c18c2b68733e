//! Health reporter over a connection pool

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tokio::time::Instant;

use super::ping::PingError;
use super::status::{HealthStatus, HealthThresholds};
use crate::pool::{ConnectionPool, PoolStats};

/// Readiness of the process to do storage-backed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Pool ready and the round trip succeeded
    Ready,
    /// Process serving, storage-backed work impaired
    Degraded,
    /// Pool shut down
    Unready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivenessReport {
    pub alive: bool,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub state: ReadinessState,
    /// Round-trip time, absent when no probe ran
    pub latency_ms: Option<u64>,
    pub latency_status: Option<HealthStatus>,
    pub pool: PoolStats,
    /// Why the pool is not ready
    pub error: Option<String>,
    /// Consecutive readiness checks that were not `Ready`
    pub consecutive_failures: u32,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }
}

/// Derives liveness and readiness from a pool
pub struct HealthReporter {
    pool: ConnectionPool,
    thresholds: HealthThresholds,
    started_at: Instant,
    consecutive_failures: AtomicU32,
}

impl HealthReporter {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            thresholds: HealthThresholds::default(),
            started_at: Instant::now(),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// The process answers, whatever the state of the pool.
    ///
    /// Yields once so a starved runtime shows up as a slow answer.
    pub async fn liveness(&self) -> LivenessReport {
        tokio::task::yield_now().await;
        LivenessReport {
            alive: true,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    pub async fn readiness(&self) -> ReadinessReport {
        let probe = self.pool.ping().await;
        let pool = self.pool.stats();

        let (state, latency, error) = match probe {
            Ok(latency) => (ReadinessState::Ready, latency, None),
            Err(PingError::ShutDown) => (
                ReadinessState::Unready,
                None,
                Some(PingError::ShutDown.to_string()),
            ),
            Err(err) => {
                let reason = match (&err, pool.last_error()) {
                    (PingError::NotReady(_), Some(last)) => format!("{err}: {last}"),
                    _ => err.to_string(),
                };
                (ReadinessState::Degraded, None, Some(reason))
            }
        };

        let consecutive_failures = if state == ReadinessState::Ready {
            self.consecutive_failures.store(0, Ordering::SeqCst);
            0
        } else {
            self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
        };

        if let Some(reason) = &error {
            tracing::debug!(state = ?state, error = %reason, consecutive_failures, "readiness check failed");
        }

        ReadinessReport {
            state,
            latency_ms: latency.map(|l| l.as_millis() as u64),
            latency_status: latency
                .map(|l| HealthStatus::from_latency_with_thresholds(l, &self.thresholds)),
            pool,
            error,
            consecutive_failures,
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.readiness().await.is_ready()
    }
}
