//! Unified error types for relaypool core.

use relaypool_types::{PoolError, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Internal error type for storage and I/O plumbing.
///
/// Everything here is fatal to the current operation and crosses the
/// dispatcher boundary as `PoolError::PersistenceFailure`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Database operation failed (SQLite).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted row holds a value this build cannot interpret.
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    /// A blocking task panicked or was cancelled.
    #[error("Task error: {0}")]
    Task(String),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for core plumbing.
pub type AppResult<T> = Result<T, AppError>;

impl From<AppError> for StoreError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Json(e) => StoreError::Serialization { message: e.to_string() },
            AppError::Corrupt(message) => StoreError::Serialization { message },
            other => StoreError::Unavailable { message: other.to_string() },
        }
    }
}

impl From<AppError> for PoolError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Config(message) => PoolError::Config(relaypool_types::ConfigError::Io {
                message,
            }),
            other => PoolError::PersistenceFailure(other.into()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_serialization_failure() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let pool: PoolError = AppError::from(json_err).into();
        assert!(matches!(
            pool,
            PoolError::PersistenceFailure(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let pool: PoolError = AppError::from(io).into();
        match pool {
            PoolError::PersistenceFailure(StoreError::Unavailable { message }) => {
                assert!(message.contains("locked"));
            },
            other => panic!("unexpected {other:?}"),
        }
    }
}
