//! # Tree Planter Backend
//!
//! Local storage core for the tree planting log. Non-UI logic only:
//!
//! ```text
//! UI layer
//!     ↓
//! Domain (RecordStore, SeasonService, CosmeticsStore)
//!     ↓
//! Storage (KeyValueStore: FileStore / MemoryStore)
//! ```

pub mod config;
pub mod domain;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::RecordStore;
use crate::storage::FileStore;

/// Everything a frontend needs, wired to the on-disk store
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub record_store: RecordStore,
}

/// Open the data directory and build the record store
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Opening data directory {}", config.data_directory.display());
    let file_store = FileStore::open(&config.data_directory)
        .with_context(|| format!("Failed to open store in {}", config.data_directory.display()))?;

    let record_store = RecordStore::new(Arc::new(file_store));

    if record_store
        .seasons()
        .recover_pending_transition()
        .await
        .context("Failed to recover interrupted season transition")?
    {
        info!("Completed an interrupted season transition");
    }

    Ok(AppState {
        config: config.clone(),
        record_store,
    })
}
