//! Save-data persistence core for the grill match game: records, catalog, debounced saves and rewards.

pub mod catalog;
pub mod config;
/// Record types, codec and storage backends.
pub mod dao;
/// Errors raised below the facade.
pub mod error;
/// Persistence, flushing, rewards and health regeneration.
pub mod services;
/// The save facade and its scheduler.
pub mod state;

pub use config::SaveConfig;
pub use error::{PersistError, SchedulerError};
pub use state::{SaveContext, SharedContext};
