//! JSON file storage backend
//!
//! All records live in a single `store.json` file in the data directory.
//! Reads are served from an in-memory copy; every write rewrites the file
//! through a temp file and rename.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::Storage;
use crate::error::Result;

/// File format for persistent storage
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    entries: BTreeMap<String, Value>,
}

/// JSON file storage backend
pub struct JsonFileStorage {
    /// Directory holding `store.json`
    storage_dir: PathBuf,
    /// In-memory copy of the file's entries
    entries: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStorage {
    /// Open (or create) the store in `storage_dir` and load existing entries
    pub async fn open(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        tokio::fs::create_dir_all(&storage_dir).await?;

        let storage = Self {
            storage_dir,
            entries: RwLock::new(BTreeMap::new()),
        };
        storage.load().await?;

        debug!("JSON file storage initialized at: {:?}", storage.storage_dir);
        Ok(storage)
    }

    fn storage_file_path(&self) -> PathBuf {
        self.storage_dir.join("store.json")
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    async fn load(&self) -> Result<()> {
        let path = self.storage_file_path();

        if !path.exists() {
            debug!("No existing storage file found");
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let file: StorageFile = serde_json::from_str(&contents)?;

        let mut entries = self.entries.write().await;
        *entries = file.entries;

        debug!("Loaded {} entries from storage", entries.len());
        Ok(())
    }

    async fn save(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let file = StorageFile {
            version: 1,
            entries: entries.clone(),
        };

        let contents = serde_json::to_string_pretty(&file)?;
        let path = self.storage_file_path();

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Saved {} entries to storage", entries.len());
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn store(&self, key: &str, value: Value) -> Result<()> {
        // Hold the write lock across the save so concurrent writers serialize;
        // memory only changes once the file write succeeded
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.save(&next).await?;
        *entries = next;

        debug!("Stored key: {}", key);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.save(&next).await?;
        *entries = next;

        debug!("Deleted key: {}", key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "JSON File Storage"
    }
}
