//! PostgreSQL driver implementation

mod connection;
mod connector;
mod tls;
mod value;

pub use connection::PostgresConnection;
pub use connector::PostgresConnector;
pub use tls::{TlsError, build_tls_connector};
