mod schema;
mod watch;

pub use schema::*;
pub use watch::spawn_config_watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Holder of the active configuration snapshot.
///
/// Readers clone the inner `Arc` once and keep using that snapshot for the
/// whole sweep; a reload swaps in a new `Arc` without touching snapshots
/// already handed out.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    /// Load the file at `path` and build a store around it
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load_config(&path)?;
        Ok(Self::new(path, config))
    }

    pub fn new<P: Into<PathBuf>>(path: P, config: Config) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.read().clone()
    }

    /// Swap in a new configuration wholesale
    pub fn replace(&self, config: Config) {
        *self.current.write() = Arc::new(config);
    }

    /// Re-read the backing file. The active snapshot is only replaced if
    /// the new file loads and validates.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let config = load_config(&self.path)?;
        info!(
            path = %self.path.display(),
            databases = config.databases.len(),
            "Configuration reloaded"
        );
        self.replace(config);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
