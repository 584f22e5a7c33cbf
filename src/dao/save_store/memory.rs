//! Volatile save backend keeping payloads in process memory.

use std::{
    io,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    models::Category,
    save_store::SaveStore,
    storage::{StorageError, StorageResult},
};

/// In-memory [`SaveStore`] that counts writes and can simulate a failing disk.
#[derive(Debug, Default)]
pub struct MemorySaveStore {
    slots: DashMap<Category, Vec<u8>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemorySaveStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation, across all categories.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current payload for `category`.
    pub fn payload(&self, category: Category) -> Option<Vec<u8>> {
        self.slots.get(&category).map(|entry| entry.value().clone())
    }

    /// Overwrite a payload without going through the counters.
    pub fn put_raw(&self, category: Category, bytes: impl Into<Vec<u8>>) {
        self.slots.insert(category, bytes.into());
    }

    /// Make every subsequent write fail until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SaveStore for MemorySaveStore {
    fn read(&self, category: Category) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let payload = self.payload(category);
        Box::pin(async move { Ok(payload) })
    }

    fn write(&self, category: Category, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::write(
                self.describe(category),
                io::Error::new(io::ErrorKind::StorageFull, "simulated write failure"),
            ))
        } else {
            self.slots.insert(category, bytes);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn remove(&self, category: Category) -> BoxFuture<'static, StorageResult<()>> {
        self.slots.remove(&category);
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.slots.clear();
        Box::pin(async { Ok(()) })
    }

    fn describe(&self, category: Category) -> String {
        format!("memory://{category}")
    }
}
