//! Configuration loading and validation for the bot storage tool.
//!
//! Uses serde_yaml to load YAML configuration files, with an environment
//! variable override for the storage directory.

mod app;
mod error;
mod storage;

pub use app::AppConfig;
pub use error::ConfigError;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Environment variable that overrides `storage.dir`.
pub const STORAGE_DIR_ENV: &str = "TRADING_BOTS_STORAGE_DIR";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tool name and log level.
    pub app: AppConfig,
    /// Where the storage document lives.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Loads `.env` first (if present) so that `TRADING_BOTS_STORAGE_DIR`
    /// can be set there as well.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let mut config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;

        if let Ok(dir) = env::var(STORAGE_DIR_ENV) {
            config.apply_storage_dir_override(dir);
        }
        config.validate()?;

        Ok(config)
    }

    fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    fn apply_storage_dir_override(&mut self, dir: String) {
        if !dir.trim().is_empty() {
            self.storage.dir = dir;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Invalid("app.name is required".into()));
        }

        if self.storage.dir.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.dir is required".into()));
        }

        Ok(())
    }
}
