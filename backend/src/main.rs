use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;
use tree_planter_backend::config::{AppConfig, DEFAULT_CONFIG_FILE};
use tree_planter_backend::initialize_backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = initialize_backend(&config).await?;
    let store = &state.record_store;

    let coins = store.cosmetics().get_user_cosmetics().await?.coins;
    match store.seasons().get_active_season().await? {
        Some(season) => {
            let stats = store.seasons().season_stats(&season.id).await?;
            info!(
                "Active season {}: {} trees over {} days, {} coins",
                season.name, stats.total_trees, stats.total_days, coins
            );
        }
        None => {
            let logs = store.get_tree_logs().await?;
            info!("No active season: {} unscoped tree logs, {} coins", logs.len(), coins);
        }
    }

    Ok(())
}
