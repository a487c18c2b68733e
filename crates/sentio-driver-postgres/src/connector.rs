//! PostgreSQL connection factory

use async_trait::async_trait;
use sentio_core::{Connection, ConnectionFactory, Endpoint, Result};

use crate::PostgresConnection;

/// Opens PostgreSQL connections for a fixed endpoint
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    endpoint: Endpoint,
}

impl PostgresConnector {
    /// Create a connector, rejecting endpoints that can never connect
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        endpoint.validate()?;
        tracing::debug!(url = %endpoint.display_url(), "PostgreSQL connector created");
        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl ConnectionFactory for PostgresConnector {
    fn name(&self) -> &str {
        "postgresql"
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let conn = PostgresConnection::connect(&self.endpoint).await?;
        Ok(Box::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentio_core::{SentioError, SslMode};

    #[test]
    fn test_connector_rejects_invalid_endpoint() {
        let err = PostgresConnector::new(Endpoint::new("", 5432, "sentio")).unwrap_err();
        assert!(matches!(err, SentioError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails_with_connection_error() {
        // Port 1 on loopback is never a PostgreSQL server.
        let endpoint = Endpoint::new("127.0.0.1", 1, "sentio").with_ssl_mode(SslMode::Disable);
        let connector = PostgresConnector::new(endpoint).unwrap();

        let err = connector.connect().await.err().unwrap();
        assert!(err.is_connection_fault(), "unexpected error: {err}");
    }
}
