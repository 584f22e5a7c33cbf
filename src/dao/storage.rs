use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by save backends regardless of where the bytes live.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read `{location}`")]
    Read {
        location: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("failed to write `{location}`")]
    Write {
        location: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a failure that happened while reading `location`.
    pub fn read(location: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Read {
            location: location.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure that happened while writing `location`.
    pub fn write(location: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Write {
            location: location.into(),
            source: Box::new(source),
        }
    }
}
