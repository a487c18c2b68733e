//! PostgreSQL TLS Support
//!
//! Builds the native-tls connector handed to tokio-postgres when the
//! endpoint asks for an encrypted session.

use native_tls::{Certificate, TlsConnector as NativeTlsConnector};
use postgres_native_tls::MakeTlsConnector;
use sentio_core::{Endpoint, SslMode};
use std::fs;
use tracing::{debug, warn};

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Failed to load CA certificate
    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    /// Invalid CA certificate format
    #[error("Invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

impl From<TlsError> for sentio_core::SentioError {
    fn from(err: TlsError) -> Self {
        sentio_core::SentioError::Configuration(err.to_string())
    }
}

/// Build a TLS connector for the endpoint.
///
/// Returns `Ok(None)` when the endpoint disables TLS. Without a root
/// certificate the server certificate is accepted as-is, which matches
/// libpq's `require` semantics; with one, the chain and hostname are verified.
pub fn build_tls_connector(endpoint: &Endpoint) -> Result<Option<MakeTlsConnector>, TlsError> {
    if endpoint.ssl_mode == SslMode::Disable {
        return Ok(None);
    }

    let mut builder = NativeTlsConnector::builder();

    match endpoint.ssl_root_cert.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => {
            let pem = fs::read(path).map_err(|source| TlsError::CaCertLoadFailed {
                path: path.to_string(),
                source,
            })?;
            let cert =
                Certificate::from_pem(&pem).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;
            builder.add_root_certificate(cert);
            debug!(path = %path, "loaded PostgreSQL root certificate");
        }
        None => {
            warn!(
                host = %endpoint.host,
                "no root certificate configured, server certificate will not be verified"
            );
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
    }

    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    Ok(Some(MakeTlsConnector::new(connector)))
}
