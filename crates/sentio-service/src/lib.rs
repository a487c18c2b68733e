//! Sentio Services Layer
//!
//! The request-handling layer of the sentiment API. It sits between the
//! outer surface (the CLI here, an HTTP router elsewhere) and the pool:
//!
//! ```text
//! Surface (sentio-cli)
//!     ↓
//! Service Layer (sentio-service) ← This crate
//!     ↓
//! Pool (sentio-connection)
//!     ↓
//! Infrastructure (sentio-core, sentio-driver-postgres)
//! ```
//!
//! # Services
//!
//! - [`PredictionService`] - classify text and log the prediction
//! - [`HealthService`] - liveness and readiness payloads
//!
//! The model is opaque behind [`Predictor`]; [`LexiconPredictor`] is the
//! built-in classifier.

mod error;
mod health_service;
pub mod logging;
mod prediction_log;
mod prediction_service;
mod predictor;
mod view_models;

#[cfg(test)]
mod test_support;

pub use error::{ServiceError, ServiceResult};
pub use health_service::HealthService;
pub use prediction_log::{PredictionLog, PredictionRecord};
pub use prediction_service::PredictionService;
pub use predictor::{LexiconPredictor, Prediction, Predictor, Sentiment};
pub use view_models::{HealthPayload, PredictionResponse, ReadyPayload};
