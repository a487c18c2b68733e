use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::predictor::Sentiment;

/// Answer to a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub id: Uuid,
    pub sentiment: Sentiment,
    pub confidence: f64,
    /// Whether the prediction reached the prediction log
    pub logged: bool,
}

/// Liveness body, `{"status":"healthy"}` whenever the process answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPayload {
    pub status: String,
    pub uptime_secs: u64,
}

/// Readiness body
#[derive(Debug, Clone, Serialize)]
pub struct ReadyPayload {
    /// `ready`, `degraded` or `unready`
    pub status: String,
    pub ready: bool,
    pub latency_ms: Option<u64>,
    pub pool_status: String,
    pub idle: usize,
    pub checked_out: usize,
    pub max_size: usize,
    pub retry_attempts: u32,
    pub next_retry_in_ms: Option<u64>,
    pub error: Option<String>,
    pub consecutive_failures: u32,
}
