//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Environment variable overriding the storage base directory
pub const STORAGE_DIRECTORY_ENV: &str = "STORAGE_DIRECTORY";

/// Subdirectory of the user's home directory used for storage by default
pub const DEFAULT_STORAGE_SUBDIR: &str = "express-files";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding every stored file
    pub base_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log4rs configuration file
    pub config_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: 4,
            cors_permissive: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            base_path: home.join(DEFAULT_STORAGE_SUBDIR),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl AppConfig {
    /// Load configuration from `config.yaml`, use defaults if not found.
    ///
    /// Nothing is logged here since the logger is configured from the result;
    /// call [`AppConfig::log_summary`] once logging is up.
    pub fn load() -> Result<(Self, ConfigSource), Box<dyn std::error::Error>> {
        let (config, source) = if Path::new(CONFIG_FILE).exists() {
            (Self::load_from(CONFIG_FILE)?, ConfigSource::File(PathBuf::from(CONFIG_FILE)))
        } else {
            (Self::default(), ConfigSource::Defaults)
        };
        Ok((config.apply_env(), source))
    }

    /// Load configuration from a specific YAML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(mut self) -> Self {
        if let Some(dir) = storage_dir_from_env() {
            self.storage.base_path = dir;
        }
        self
    }

    /// Log how this configuration was assembled
    pub fn log_summary(&self, source: &ConfigSource) {
        match source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => warn!("Config file not found, using defaults"),
        }
        if let Some(dir) = storage_dir_from_env() {
            info!("Using storage directory from environment: {}", dir.display());
        } else if dirs::home_dir().is_none() && self.storage == StorageConfig::default() {
            warn!("No home directory found, storing files under the working directory");
        }
    }
}

fn storage_dir_from_env() -> Option<PathBuf> {
    env::var(STORAGE_DIRECTORY_ENV)
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}
