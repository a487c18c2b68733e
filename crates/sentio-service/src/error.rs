use sentio_connection::PoolError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage-backed work could not be done
    #[error(transparent)]
    Storage(#[from] PoolError),
}

impl ServiceError {
    /// Whether the caller may retry the same request later
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::InvalidInput(_) => false,
            ServiceError::Storage(err) => err.is_transient(),
        }
    }
}
