//! Sentio Core - Core abstractions shared by the pool, drivers and service
//!
//! This crate provides the fundamental traits and types that all other
//! Sentio crates depend on. It defines:
//!
//! - `Connection` - Trait for a single physical connection to the backing store
//! - `ConnectionFactory` - Trait for opening new connections
//! - `Endpoint` - Address and credentials of the backing store
//! - Common types like `Value`, `Row`, `QueryResult`
//! - `SentioError` - The error type returned by drivers

mod connection;
mod endpoint;
mod error;
mod factory;
mod types;

pub use connection::*;
pub use endpoint::*;
pub use error::*;
pub use factory::*;
pub use types::*;
