//! File-based storage backend
//!
//! One JSON file per key under `<base_dir>/kv/`. Each file holds an envelope
//! with the original key, so scans never have to decode file names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::storage::{
    config::StorageConfig,
    error::{StorageError, StorageResult},
    traits::KeyValueStore,
};

const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    value: Value,
}

/// File-based storage backend
#[derive(Debug, Clone)]
pub struct FileBackend {
    entries_dir: PathBuf,
}

impl FileBackend {
    /// Create the backend, making sure its directory exists
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        Self::open(&config.base_dir).await
    }

    pub async fn open(base_dir: &Path) -> StorageResult<Self> {
        let entries_dir = base_dir.join("kv");
        fs::create_dir_all(&entries_dir).await?;
        Ok(Self { entries_dir })
    }

    pub fn entries_dir(&self) -> &Path {
        &self.entries_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.entries_dir
            .join(format!("{}.{}", encode_key(key), ENTRY_EXTENSION))
    }

    async fn read_envelope(path: &Path) -> StorageResult<Envelope> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(StorageError::serialization)
    }
}

/// Percent-encode everything outside `[A-Za-z0-9._-]` so any key is a safe,
/// unique file name
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

#[async_trait]
impl KeyValueStore for FileBackend {
    fn backend_type(&self) -> &'static str {
        "file"
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        let envelope = Envelope {
            key: key.to_string(),
            value: value.clone(),
        };
        let content = serde_json::to_string_pretty(&envelope)?;

        // Write then rename so readers never see a half-written entry
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.path_for(key);
        match Self::read_envelope(&path).await {
            Ok(envelope) => Ok(Some(envelope.value)),
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.entries_dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match Self::read_envelope(&path).await {
                Ok(envelope) if envelope.key.starts_with(prefix) => {
                    entries.push((envelope.key, envelope.value));
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("checadoc:ver:VER-1"), "checadoc%3Aver%3AVER-1");
        assert_eq!(encode_key("a/b"), "a%2Fb");
        assert_ne!(encode_key("a:b"), encode_key("a_b"));
    }

    #[tokio::test]
    async fn test_round_trip_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).await.unwrap();
        backend.set("ver:1", &json!({"status": "pending"})).await.unwrap();

        let reopened = FileBackend::open(temp_dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("ver:1").await.unwrap(),
            Some(json!({"status": "pending"}))
        );
        assert_eq!(reopened.get("ver:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).await.unwrap();
        backend.set("k", &json!(1)).await.unwrap();
        backend.delete("k").await.unwrap();
        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_prefix_skips_foreign_and_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).await.unwrap();
        backend.set("ver:b", &json!("b")).await.unwrap();
        backend.set("ver:a", &json!("a")).await.unwrap();
        backend.set("other", &json!("o")).await.unwrap();
        std::fs::write(backend.entries_dir().join("broken.json"), "{not json").unwrap();
        std::fs::write(backend.entries_dir().join("notes.txt"), "ignored").unwrap();

        let entries = backend.scan_prefix("ver:").await.unwrap();
        assert_eq!(
            entries,
            vec![
                ("ver:a".to_string(), json!("a")),
                ("ver:b".to_string(), json!("b")),
            ]
        );
    }
}
