//! Storage factory for creating storage instances

use std::sync::Arc;

use super::backends::{FileBackend, MemoryBackend};
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::KeyValueStore;

/// Factory for creating storage instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create storage from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
        match config.backend {
            BackendType::File => Ok(Arc::new(FileBackend::new(config).await?)),
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
        }
    }
}
