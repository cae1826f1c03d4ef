//! services/client/src/adapters/kv_store.rs
//!
//! Device-local key-value storage kept in a single JSON file. Implements the
//! `KeyValueStore` port from the `core` crate.

use async_trait::async_trait;
use pass_share_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

/// A key-value store backed by one JSON object on disk.
///
/// Every operation re-reads the file, so several processes sharing a data
/// directory see each other's writes. Writes go through a temporary file and
/// a rename.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> PortResult<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                // A corrupt store is treated as empty rather than locking the user out.
                warn!(path = %self.path.display(), "Discarding unreadable store: {}", e);
                Ok(BTreeMap::new())
            }
        }
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| PortError::Storage(format!("Could not encode the store: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn values_survive_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("user").await.unwrap(), None);
        store.set("user", r#"{"id":"1"}"#).await.unwrap();
        store.set("hasOnboarded", "true").await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("user").await.unwrap().as_deref(),
            Some(r#"{"id":"1"}"#)
        );
        reopened.remove("user").await.unwrap();
        assert_eq!(store.get("user").await.unwrap(), None);
        assert_eq!(store.get("hasOnboarded").await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("user").await.unwrap(), None);
        store.set("user", "x").await.unwrap();
        assert_eq!(store.get("user").await.unwrap().as_deref(), Some("x"));
    }
}
