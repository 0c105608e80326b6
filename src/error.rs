use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
///
/// Nothing here is fatal to the process; every variant is scoped to a
/// single request or game.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Durable backend refused an operation that required it.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Operation needed the durable tier while none is installed.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No game resolvable for the given identity. Callers typically react
    /// by creating a fresh game and surfacing a "session expired" notice.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}
