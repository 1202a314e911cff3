use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored document could not be mapped back to an entity.
    #[error("corrupt record `{key}`: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a corruption error for a record that failed to decode.
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        StorageError::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
