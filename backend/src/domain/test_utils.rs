//! Test utilities shared by the domain tests
//!
//! Each `TestEnvironment` owns a fresh in-memory store, so tests never see
//! each other's data.

use std::sync::Arc;

use super::record_store::RecordStore;
use crate::storage::{KeyValueStore, MemoryStore};

pub struct TestEnvironment {
    /// The backing key-value store, for inspecting raw keys
    pub kv: MemoryStore,
    pub record_store: RecordStore,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let kv = MemoryStore::new();
        let record_store = RecordStore::new(Arc::new(kv.clone()));
        Self { kv, record_store }
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.kv.get_item(key).await.expect("memory store read failed")
    }

    pub async fn set_raw(&self, key: &str, value: &str) {
        self.kv
            .set_item(key, value)
            .await
            .expect("memory store write failed");
    }

    pub async fn keys(&self) -> Vec<String> {
        self.kv.get_all_keys().await.expect("memory store listing failed")
    }
}
