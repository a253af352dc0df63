//! Key-value storage layer
//!
//! Verification records are persisted through [`KeyValueStore`]. The file
//! backend is the default; the memory backend serves tests and dry runs.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;

pub use backends::{FileBackend, MemoryBackend};
pub use config::{default_storage_dir, BackendType, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use traits::KeyValueStore;
