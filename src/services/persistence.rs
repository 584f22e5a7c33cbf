use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    dao::{codec::SaveCodec, models::Record, save_store::SaveStore},
    error::PersistError,
};

/// A record fresh from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    /// The decoded record, or its default after recovery.
    pub record: T,
    /// Whether the backend payload now matches `record`.
    pub persisted: bool,
}

/// Loads, saves and resets records, one payload per category.
///
/// Loads never fail: a missing payload yields a persisted default and a
/// corrupt one is logged and replaced by a persisted default.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn SaveStore>,
    codec: SaveCodec,
}

impl Persistence {
    /// Combine a backend with the codec applied to every payload.
    pub fn new(store: Arc<dyn SaveStore>, codec: SaveCodec) -> Self {
        Self { store, codec }
    }

    /// Backend holding the payloads.
    pub fn store(&self) -> &Arc<dyn SaveStore> {
        &self.store
    }

    /// Load the record of type `T`, recovering to a persisted default on any failure.
    pub async fn load<T: Record>(&self) -> T {
        self.load_tracked::<T>().await.record
    }

    /// Like [`Persistence::load`], also reporting whether the backend holds the returned record.
    ///
    /// `persisted` is `false` only when a recovered default could not be written.
    pub async fn load_tracked<T: Record>(&self) -> Loaded<T> {
        let category = T::CATEGORY;
        match self.try_load::<T>().await {
            Ok(Some(record)) => Loaded {
                record,
                persisted: true,
            },
            Ok(None) => {
                info!(%category, "no save found; starting from defaults");
                self.persist_default::<T>().await
            }
            Err(err) => {
                warn!(
                    %category,
                    location = %self.store.describe(category),
                    error = %err,
                    "save unreadable; resetting to defaults"
                );
                self.persist_default::<T>().await
            }
        }
    }

    /// Read and decode the record without any recovery.
    pub async fn try_load<T: Record>(&self) -> Result<Option<T>, PersistError> {
        let Some(bytes) = self.store.read(T::CATEGORY).await? else {
            return Ok(None);
        };
        self.codec.decode(bytes).map(Some)
    }

    /// Serialize `record` and overwrite its category payload.
    pub async fn save<T: Record>(&self, record: &T) -> Result<(), PersistError> {
        let bytes = self.codec.encode(record)?;
        self.store.write(T::CATEGORY, bytes).await?;
        Ok(())
    }

    /// Build a default record, persist it immediately and return it.
    ///
    /// A failed write is logged and the in-memory default is returned either
    /// way. Use [`Persistence::load_tracked`] to learn whether it reached the backend.
    pub async fn reset_default<T: Record>(&self) -> T {
        self.persist_default::<T>().await.record
    }

    async fn persist_default<T: Record>(&self) -> Loaded<T> {
        let record = T::default();
        let persisted = match self.save(&record).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    category = %T::CATEGORY,
                    error = %err,
                    "failed to persist default record"
                );
                false
            }
        };
        Loaded { record, persisted }
    }
}
