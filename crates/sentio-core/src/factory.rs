//! Connection factory trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Opens single physical connections to the backing store
///
/// A factory is created once from an immutable endpoint description and is
/// shared by the pool and its retry supervisor. `connect` must fail fast with
/// a typed error when the store is unreachable or rejects the credentials.
/// The pool bounds every call with its own connect timeout.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Short name used in logs (e.g. "postgresql")
    fn name(&self) -> &str;

    /// Open a new connection, completing the handshake before returning
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        (**self).connect().await
    }
}
