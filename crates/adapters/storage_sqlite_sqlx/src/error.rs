//! Storage-specific error type wrapping sqlx errors.

use sqlx::error::ErrorKind;

use orchestrator_domain::error::{ConflictError, InventoryError};

/// `SQLITE_BUSY` primary result code.
const SQLITE_BUSY: i32 = 5;
/// `SQLITE_LOCKED` primary result code.
const SQLITE_LOCKED: i32 = 6;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to deserialize a stored JSON value.
    #[error("JSON deserialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    /// Whether the failure came from a concurrent unit of work: the database
    /// was busy or locked, or a uniqueness constraint rejected the write.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        let Self::Database(sqlx::Error::Database(err)) = self else {
            return false;
        };
        if matches!(err.kind(), ErrorKind::UniqueViolation) {
            return true;
        }
        err.code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
    }
}

impl From<StorageError> for InventoryError {
    fn from(err: StorageError) -> Self {
        if err.is_conflict() {
            ConflictError {
                source: Box::new(err),
            }
            .into()
        } else {
            Self::Storage(Box::new(err))
        }
    }
}

/// Map a value that failed to parse while decoding a row.
pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}
