//! # Storage Traits
//!
//! The key-value primitive every store in this crate is built on. Values are
//! JSON text; the primitive itself knows nothing about their schema.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};

/// Async key-value store over a single flat namespace
///
/// Implementations give no transactions across keys. Anything that needs a
/// multi-key update has to journal it itself (see the season service).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing anything already there
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Remove several keys at once
    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()>;

    /// Every key currently stored
    async fn get_all_keys(&self) -> StorageResult<Vec<String>>;
}

/// Read and decode a JSON value
pub async fn get_json<T, S>(store: &S, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get_item(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw).map_err(|e| {
                warn!("Failed to decode value stored under {}: {}", key, e);
                StorageError::Serialization(e)
            })?;
            Ok(Some(value))
        }
        None => {
            debug!("No value stored under {}", key);
            Ok(None)
        }
    }
}

/// Encode and store a JSON value
pub async fn set_json<T, S>(store: &S, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + ?Sized + Sync,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set_item(key, &raw).await?;
    debug!("Stored {} bytes under {}", raw.len(), key);
    Ok(())
}

/// Read a JSON list, treating an absent key as an empty list
pub async fn get_json_list<T, S>(store: &S, key: &str) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    Ok(get_json::<Vec<T>, S>(store, key).await?.unwrap_or_default())
}
