use std::string::FromUtf8Error;

use thiserror::Error;

use crate::dao::{models::Category, storage::StorageError};

/// Errors raised while turning records into save payloads and back.
///
/// These never cross the [`SaveContext`](crate::state::SaveContext) boundary:
/// loads recover by resetting the category and flushes log and retry.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The backend could not read or write the payload.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The record could not be serialized.
    #[error("failed to encode `{category}` record")]
    Encode {
        category: Category,
        #[source]
        source: serde_json::Error,
    },
    /// The payload is not UTF-8 once de-obfuscated.
    #[error("`{category}` payload is not valid UTF-8")]
    Utf8 {
        category: Category,
        #[source]
        source: FromUtf8Error,
    },
    /// The payload is not a valid record.
    #[error("failed to decode `{category}` record")]
    Decode {
        category: Category,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors reported when talking to the background flush worker.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker task has stopped and can no longer flush.
    #[error("save scheduler stopped")]
    Stopped,
}
