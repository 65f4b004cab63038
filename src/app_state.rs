//! Application State Management
//!
//! This module provides the application state shared by every handler,
//! following the dependency injection pattern.

use std::sync::Arc;

use log::info;

use crate::config::AppConfig;
use crate::service::FileService;
use crate::storage::StorageError;

/// Application state containing the file service and its configuration
#[derive(Clone)]
pub struct AppState {
    pub file_service: Arc<FileService>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration, creating the storage
    /// directory if it is missing
    pub async fn from_config(config: AppConfig) -> Result<Self, StorageError> {
        info!("Initializing application state with configuration");
        let file_service = FileService::open(&config.storage.base_path).await?;
        Ok(Self::with_service(file_service, config))
    }

    /// Wrap an already constructed service
    pub fn with_service(file_service: FileService, config: AppConfig) -> Self {
        Self {
            file_service: Arc::new(file_service),
            config,
        }
    }
}
