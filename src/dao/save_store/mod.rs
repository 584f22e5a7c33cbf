#[cfg(feature = "file-store")]
pub mod file;
pub mod memory;

use crate::dao::{models::Category, storage::StorageResult};
use futures::future::BoxFuture;

/// Abstraction over where save payloads for each category are kept.
pub trait SaveStore: Send + Sync {
    /// Read the raw payload for `category`, `None` when nothing was saved yet.
    fn read(&self, category: Category) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// Replace the payload for `category`.
    fn write(&self, category: Category, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the payload for `category`, succeeding when it was already absent.
    fn remove(&self, category: Category) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove every payload owned by this store.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Human readable location of `category`, used in logs.
    fn describe(&self, category: Category) -> String;
}
