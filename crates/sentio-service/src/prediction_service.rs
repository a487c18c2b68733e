//! Prediction service
//!
//! Classifies text and records the result in the prediction log. A
//! prediction is always answered when the model can run; logging is best
//! effort and never fails the request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sentio_connection::ConnectionPool;

use crate::error::{ServiceError, ServiceResult};
use crate::prediction_log::{PredictionLog, PredictionRecord};
use crate::predictor::Predictor;
use crate::view_models::PredictionResponse;

/// Longest input accepted, in characters
pub const MAX_INPUT_CHARS: usize = 5_000;

/// Most rows `recent` returns in one call
pub const MAX_RECENT_LIMIT: u32 = 1_000;

/// Service for serving and logging predictions
pub struct PredictionService {
    predictor: Arc<dyn Predictor>,
    log: PredictionLog,
    log_failures: AtomicU64,
}

impl PredictionService {
    /// Create a new prediction service
    ///
    /// # Arguments
    ///
    /// * `predictor` - The model answering requests
    /// * `pool` - Pool backing the prediction log
    pub fn new(predictor: Arc<dyn Predictor>, pool: ConnectionPool) -> Self {
        Self {
            predictor,
            log: PredictionLog::new(pool),
            log_failures: AtomicU64::new(0),
        }
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    /// Predictions answered without reaching the log
    pub fn log_failures(&self) -> u64 {
        self.log_failures.load(Ordering::Relaxed)
    }

    /// Classify `text` and log the result
    ///
    /// # Errors
    ///
    /// `InvalidInput` for blank or oversized text. Storage problems are
    /// reported through `PredictionResponse::logged` instead.
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn predict(&self, text: &str) -> ServiceResult<PredictionResponse> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidInput("text must not be empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(ServiceError::InvalidInput(format!(
                "text is {chars} characters, limit is {MAX_INPUT_CHARS}"
            )));
        }

        let prediction = self.predictor.predict(text);
        let record = PredictionRecord::new(text, prediction);

        let logged = match self.log.insert(&record).await {
            Ok(()) => true,
            Err(e) => {
                self.log_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(id = %record.id, error = %e, "prediction served without logging");
                false
            }
        };

        tracing::info!(
            id = %record.id,
            sentiment = %prediction.sentiment,
            confidence = prediction.confidence,
            logged,
            "prediction served"
        );

        Ok(PredictionResponse {
            id: record.id,
            sentiment: prediction.sentiment,
            confidence: prediction.confidence,
            logged,
        })
    }

    /// Most recent logged predictions, newest first
    ///
    /// `InvalidInput` unless `limit` is between 1 and [`MAX_RECENT_LIMIT`].
    pub async fn recent(&self, limit: usize) -> ServiceResult<Vec<PredictionRecord>> {
        let limit = u32::try_from(limit)
            .ok()
            .filter(|limit| (1..=MAX_RECENT_LIMIT).contains(limit))
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "limit must be between 1 and {MAX_RECENT_LIMIT}, got {limit}"
                ))
            })?;
        Ok(self.log.recent(limit).await?)
    }
}
