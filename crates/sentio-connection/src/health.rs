//! Liveness and readiness
//!
//! Liveness answers "is the process responsive" and never touches the
//! pool. Readiness answers "can storage-backed work succeed right now" by
//! running a round trip on a pooled connection.
//!
//! # Example
//!
//! ```ignore
//! use sentio_connection::HealthReporter;
//!
//! let reporter = HealthReporter::new(pool.clone());
//! assert!(reporter.liveness().await.alive);
//! let report = reporter.readiness().await;
//! println!("{:?} ({:?} ms)", report.state, report.latency_ms);
//! ```

mod ping;
mod reporter;
mod status;


pub use ping::{PingError, PingResult, ping_database, ping_with_timeout};
pub use reporter::{HealthReporter, LivenessReport, ReadinessReport, ReadinessState};
pub use status::{HealthStatus, HealthThresholds};
