//! Config manager for loading, saving, and validating settings.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Stage table validated on load, so a bad weight table is caught at
//!   startup rather than mid-job

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::stages::StageError;

use super::settings::Settings;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid stage table in config: {0}")]
    InvalidStages(#[from] StageError),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes are only in memory until `save()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns an error if the file doesn't exist or the stage table is
    /// invalid.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.stage_plan()?;
        self.settings = settings;
        tracing::debug!(path = %self.config_path.display(), "config loaded");
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't
    /// exist.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            self.settings = Settings::default();
            self.save()?;
            tracing::info!(path = %self.config_path.display(), "created default config");
            Ok(())
        }
    }

    /// Persist current settings to disk atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = toml::to_string_pretty(&self.settings)?;

        // Write atomically via temp file
        let temp_file = self.config_path.with_extension("toml.tmp");
        fs::write(&temp_file, &content)?;
        fs::rename(&temp_file, &self.config_path)?;
        Ok(())
    }
}
