//! Core trait definition for the key-value storage layer

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageResult;

/// Durable key-value persistence.
///
/// Values are JSON documents. Backends own their own durability; callers
/// treat every operation as possibly failing and retryable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name for diagnostics ("file", "memory")
    fn backend_type(&self) -> &'static str;

    /// Insert or replace the value stored under `key`
    async fn set(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// All entries whose key starts with `prefix`, in key order
    async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>>;
}
