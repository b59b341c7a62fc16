//! # Application Configuration
//!
//! A small YAML file, read once at startup.
//!
//! ```yaml
//! data_directory: "/home/user/Documents/Tree Planter"
//! log_level: "info"
//! ```
//!
//! A missing file means defaults. `TREE_PLANTER_DATA_DIR` overrides the data
//! directory either way.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DATA_DIR_ENV: &str = "TREE_PLANTER_DATA_DIR";
pub const DEFAULT_CONFIG_FILE: &str = "tree_planter.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            log_level: default_log_level(),
        }
    }
}

/// `~/Documents/Tree Planter`, or `./data` when no home directory is known
fn default_data_directory() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Documents").join("Tree Planter"))
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load from `path` if it exists, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let yaml_content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: AppConfig = serde_yaml::from_str(&yaml_content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            debug!("Loaded config from {:?}", path);
            config
        } else {
            info!("No config file at {}, using defaults", path.display());
            AppConfig::default()
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_directory = PathBuf::from(dir.trim());
            }
        }

        Ok(config)
    }
}
