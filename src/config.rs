//! Save-layer configuration loading: save location, flush cadence and obfuscation.

use std::{
    collections::BTreeSet,
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::{dao::models::Category, state::scheduler::DEFAULT_SAVE_INTERVAL};

/// Default location on disk where the host looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/save.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GRILLMATCH_SAVE_CONFIG_PATH";
const DEFAULT_SAVE_DIR: &str = "saves";
const DEFAULT_EXTENSION: &str = "save";
const DEFAULT_OBFUSCATION_KEY: &str = "NamPhuThuy";

/// Immutable runtime configuration of the save layer.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveConfig {
    /// Directory holding one file per category.
    pub save_dir: PathBuf,
    /// File extension of save files, without the dot.
    pub extension: String,
    /// Quiet period before dirty categories are flushed.
    #[serde(rename = "save_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub save_interval: Duration,
    /// XOR key applied to obfuscated categories.
    pub obfuscation_key: String,
    /// Categories written through the XOR transform. Empty means all cleartext.
    pub obfuscated: BTreeSet<Category>,
    /// Optional design-data catalog document.
    pub catalog_path: Option<PathBuf>,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            extension: DEFAULT_EXTENSION.to_owned(),
            save_interval: DEFAULT_SAVE_INTERVAL,
            obfuscation_key: DEFAULT_OBFUSCATION_KEY.to_owned(),
            obfuscated: BTreeSet::new(),
            catalog_path: None,
        }
    }
}

impl SaveConfig {
    /// Load the configuration from the resolved path, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration at `path`; unreadable or invalid files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        save_dir = %config.save_dir.display(),
                        interval_ms = config.save_interval.as_millis() as u64,
                        obfuscated = ?config.obfuscated,
                        "loaded save config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse save config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "save config not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read save config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Whether `category` is written through the XOR transform.
    pub fn is_obfuscated(&self, category: Category) -> bool {
        self.obfuscated.contains(&category)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
