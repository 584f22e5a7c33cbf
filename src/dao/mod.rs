/// Byte codec turning records into save payloads.
pub mod codec;
/// Persisted record definitions.
pub mod models;
/// Backends holding the raw save payloads.
pub mod save_store;
/// Storage abstraction errors shared by every backend.
pub mod storage;
