//! Infrastructure error types and boundary mapping

use requeue_domain::RequeueError;
use thiserror::Error;

/// Errors raised inside the infrastructure layer before they cross the
/// domain boundary.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<InfraError> for RequeueError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Sqlite(e) => Self::Database(e.to_string()),
            InfraError::Pool(e) => Self::Database(e.to_string()),
            InfraError::Serde(e) => Self::InvalidInput(e.to_string()),
            InfraError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}
