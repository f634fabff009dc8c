// src/config/mod.rs
mod schema;

use std::path::{Path, PathBuf};
use config::{Config as ConfigLoader, FileFormat};
use tracing::{info, warn};

pub use schema::{Config, GlobalConfig, ApiConfig, PathsConfig, SearchConfig};

use crate::error::{OsintResult, OsintError};

/// Centralized configuration handling
impl Config {
    /// Built-in defaults, then the user file (explicit or `~/.osintkit`), then `OSINTKIT__*` variables
    pub fn load(config_path: Option<&Path>) -> OsintResult<Self> {
        let user_file = match config_path {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => {
                warn!("Specified configuration file not found: {}", path.display());
                None
            }
            None => Some(Self::get_default_config_path()).filter(|path| path.exists()),
        };

        let mut builder = ConfigLoader::builder().add_source(config::File::from_str(
            include_str!("../../config/default.toml"),
            FileFormat::Toml,
        ));

        match &user_file {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path.as_path()));
            }
            None => info!("Using built-in configuration defaults"),
        }

        builder
            .add_source(config::Environment::with_prefix("OSINTKIT").separator("__"))
            .build()
            .and_then(ConfigLoader::try_deserialize)
            .map_err(|e| OsintError::ConfigError(format!("Invalid configuration: {}", e)))
    }

    /// Get the default configuration path
    pub fn get_default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".osintkit/config/config.toml")
    }

    /// Write the default configuration to the default location
    pub fn init(force: bool) -> OsintResult<PathBuf> {
        let config_path = Self::get_default_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OsintError::FileError {
                    path: parent.to_path_buf(),
                    message: format!("Failed to create directory: {}", e),
                })?;
        }

        if config_path.exists() && !force {
            return Err(OsintError::ConfigError(
                format!("Configuration already exists at {}. Use --force to overwrite.", config_path.display())
            ));
        }

        Config::default().save(&config_path)?;

        Ok(config_path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> OsintResult<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| OsintError::SerializationError(format!("Failed to serialize configuration: {}", e)))?;

        std::fs::write(path, config_str)
            .map_err(|e| OsintError::FileError {
                path: path.to_path_buf(),
                message: format!("Failed to write configuration: {}", e),
            })?;

        info!("Configuration saved to {}", path.display());

        Ok(())
    }

    /// Location of the append-only search history log
    pub fn history_path(&self) -> PathBuf {
        self.global.data_dir.join("osint_history.jsonl")
    }
}
