//! Health endpoints
//!
//! Liveness answers as long as the process does. Readiness reflects the
//! pool and may report degraded while liveness stays healthy.

use sentio_connection::{ConnectionPool, HealthReporter, ReadinessReport, ReadinessState};

use crate::view_models::{HealthPayload, ReadyPayload};

pub struct HealthService {
    reporter: HealthReporter,
}

impl HealthService {
    pub fn new(pool: ConnectionPool) -> Self {
        Self::with_reporter(HealthReporter::new(pool))
    }

    pub fn with_reporter(reporter: HealthReporter) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &HealthReporter {
        &self.reporter
    }

    /// Liveness payload; never touches the database
    pub async fn health(&self) -> HealthPayload {
        let liveness = self.reporter.liveness().await;
        HealthPayload {
            status: "healthy".to_string(),
            uptime_secs: liveness.uptime_secs,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn ready(&self) -> ReadyPayload {
        ReadyPayload::from(self.reporter.readiness().await)
    }
}

impl From<ReadinessReport> for ReadyPayload {
    fn from(report: ReadinessReport) -> Self {
        let status = match report.state {
            ReadinessState::Ready => "ready",
            ReadinessState::Degraded => "degraded",
            ReadinessState::Unready => "unready",
        };
        Self {
            status: status.to_string(),
            ready: report.is_ready(),
            latency_ms: report.latency_ms,
            pool_status: report.pool.status().to_string(),
            idle: report.pool.idle(),
            checked_out: report.pool.checked_out(),
            max_size: report.pool.max_size(),
            retry_attempts: report.pool.retry_attempts(),
            next_retry_in_ms: report.pool.next_retry_in_ms(),
            error: report.error,
            consecutive_failures: report.consecutive_failures,
        }
    }
}
