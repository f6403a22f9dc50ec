//! Crate-level error type
//!
//! Repository operations return the structured [`RepositoryError`]; setup paths (loading
//! configuration, installing tracing, creating tables) return [`Error`].

use thiserror::Error;

use crate::ids::EntityIdError;
use crate::repository::RepositoryError;
use crate::storage::StorageError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured storage error
    #[error("{0}")]
    Storage(StorageError),

    /// Structured repository error
    #[error("{0}")]
    Repository(RepositoryError),

    /// Malformed entity id
    #[error("Invalid entity ID: {0}")]
    InvalidId(#[from] EntityIdError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(StorageError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;
    use crate::storage::StorageOperation;

    #[test]
    fn test_storage_error_displays_unchanged() {
        let err: Error = StorageError::query_failed(StorageOperation::Count, "boom").into();
        assert_eq!(err.to_string(), "Storage query_failed error during count: boom");
    }

    #[test]
    fn test_repository_error_converts() {
        let err: Error =
            RepositoryError::validation(RepositoryOperation::Register, "name is required").into();
        assert!(matches!(err, Error::Repository(_)));
    }
}
