//! # File Key-Value Store
//!
//! Keeps the whole namespace in one JSON document inside the data directory.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── tree_planter.yaml   (optional config)
//! └── store.json          ← This module manages this file
//! ```
//!
//! ## Format
//!
//! ```json
//! {
//!   "@active_season": "{\"id\":\"season::...\",...}",
//!   "@seasons": "[...]"
//! }
//! ```
//!
//! Values are kept as JSON *text* so the file mirrors the key-value contract
//! exactly. Every mutation rewrites the document through a temp file and a
//! rename, so a crash leaves either the old or the new document on disk.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::StorageResult;
use super::traits::KeyValueStore;

pub const STORE_FILE_NAME: &str = "store.json";

#[derive(Clone)]
pub struct FileStore {
    file_path: PathBuf,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Open (or create) the store inside `data_directory`
    pub fn open<P: AsRef<Path>>(data_directory: P) -> StorageResult<Self> {
        let base_path = data_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        let file_path = base_path.join(STORE_FILE_NAME);
        let entries = if file_path.exists() {
            let content = fs::read_to_string(&file_path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        info!("Opened store at {} with {} keys", file_path.display(), entries.len());
        Ok(Self {
            file_path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = self.file_path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.file_path)?;
        debug!("Persisted {} keys to {:?}", entries.len(), self.file_path);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(old) = entries.remove(key) {
            if let Err(e) = self.persist(&entries) {
                entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let mut removed = Vec::new();
        for key in keys {
            if let Some(old) = entries.remove(key) {
                removed.push((key.clone(), old));
            }
        }
        if removed.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.persist(&entries) {
            entries.extend(removed);
            return Err(e);
        }
        Ok(())
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}
