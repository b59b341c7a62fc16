//! Season lifecycle: create, archive and switch the active season.
//!
//! ## Business Rules
//!
//! - At most one season is active; starting or switching to another season
//!   archives the current one first
//! - Archiving freezes `total_trees`, `total_earnings` and `total_days` from
//!   the season's own partitions and stamps `end_date`
//! - Sick days and days off do not count toward `total_days`
//!
//! ## Transitions
//!
//! A transition touches `@seasons` and `@active_season`, and the key-value
//! store has no multi-key transactions. Each transition is therefore written
//! to `@season_transition` before anything else changes, applied with
//! idempotent upserts, then cleared. `recover_pending_transition` replays a
//! journal left behind by an interrupted run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use shared::{Season, SeasonStats};

use super::cosmetics_service::CosmeticsStore;
use super::scope::Scope;
use super::scoped_repository::ScopedRepository;
use crate::storage::{
    get_json, get_json_list, keys, set_json, KeyValueStore, StorageError, StorageResult,
};

/// Journal entry for one season transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTransition {
    /// The previously active season, already archived
    pub outgoing: Option<Season>,
    /// The season becoming active; `None` leaves no season active
    pub incoming: Option<Season>,
    pub started_at: String,
}

#[derive(Clone)]
pub struct SeasonService {
    store: Arc<dyn KeyValueStore>,
    cosmetics: CosmeticsStore,
    partition_lock: Arc<Mutex<()>>,
    transition_lock: Arc<Mutex<()>>,
}

impl SeasonService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cosmetics: CosmeticsStore,
        partition_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            cosmetics,
            partition_lock,
            transition_lock: Arc::new(Mutex::new(())),
        }
    }

    fn season_repository(&self, season_id: &str) -> ScopedRepository {
        ScopedRepository::new(
            self.store.clone(),
            self.cosmetics.clone(),
            self.partition_lock.clone(),
            Scope::Season(season_id.to_string()),
        )
    }

    /// All seasons, active and archived
    pub async fn get_seasons(&self) -> StorageResult<Vec<Season>> {
        get_json_list(self.store.as_ref(), keys::SEASONS).await
    }

    pub async fn get_active_season(&self) -> StorageResult<Option<Season>> {
        get_json(self.store.as_ref(), keys::ACTIVE_SEASON).await
    }

    /// Live aggregates for any season, computed from its partitions
    pub async fn season_stats(&self, season_id: &str) -> StorageResult<SeasonStats> {
        self.season_repository(season_id).season_stats().await
    }

    /// Archive the active season (if any) and start a new active one
    pub async fn create_new_season(&self, province: &str, year: i32) -> StorageResult<Season> {
        let _transition = self.transition_lock.lock().await;
        let _partitions = self.partition_lock.lock().await;

        let result: StorageResult<Season> = async {
            let now = Utc::now().to_rfc3339();
            let outgoing = self.archive_current(&now).await?;
            let incoming = Season::start(province, year, now.clone());

            self.run_transition(SeasonTransition {
                outgoing,
                incoming: Some(incoming.clone()),
                started_at: now,
            })
            .await?;
            Ok(incoming)
        }
        .await;

        match result {
            Ok(season) => {
                info!("Started season {} ({})", season.name, season.id);
                Ok(season)
            }
            Err(e) => {
                error!("Failed to create season {} {}: {}", province, year, e);
                Err(e)
            }
        }
    }

    /// Archive the active season and leave no season active, so entity
    /// operations fall back to the legacy partition.
    pub async fn archive_active_season(&self) -> StorageResult<Option<Season>> {
        let _transition = self.transition_lock.lock().await;
        let _partitions = self.partition_lock.lock().await;

        let now = Utc::now().to_rfc3339();
        let Some(archived) = self.archive_current(&now).await? else {
            info!("No active season to archive");
            return Ok(None);
        };

        self.run_transition(SeasonTransition {
            outgoing: Some(archived.clone()),
            incoming: None,
            started_at: now,
        })
        .await?;
        info!("Archived season {} ({})", archived.name, archived.id);
        Ok(Some(archived))
    }

    /// Make an existing season the active one, archiving the current season
    /// first when it is a different one.
    pub async fn switch_active_season(&self, season_id: &str) -> StorageResult<Season> {
        let _transition = self.transition_lock.lock().await;
        let _partitions = self.partition_lock.lock().await;

        if let Some(active) = self.get_active_season().await? {
            if active.id == season_id {
                return Ok(active);
            }
        }

        let mut target = self
            .get_seasons()
            .await?
            .into_iter()
            .find(|s| s.id == season_id)
            .ok_or_else(|| StorageError::NotFound(format!("season {}", season_id)))?;

        let now = Utc::now().to_rfc3339();
        let outgoing = self.archive_current(&now).await?;
        target.is_active = true;
        target.end_date = None;

        self.run_transition(SeasonTransition {
            outgoing,
            incoming: Some(target.clone()),
            started_at: now,
        })
        .await?;
        info!("Switched active season to {} ({})", target.name, target.id);
        Ok(target)
    }

    /// Replay a transition left behind by an interrupted run. Returns whether
    /// one was found.
    pub async fn recover_pending_transition(&self) -> StorageResult<bool> {
        let _transition = self.transition_lock.lock().await;
        let _partitions = self.partition_lock.lock().await;

        let pending: Option<SeasonTransition> =
            get_json(self.store.as_ref(), keys::SEASON_TRANSITION).await?;
        let Some(pending) = pending else {
            return Ok(false);
        };

        warn!("Recovering season transition started at {}", pending.started_at);
        self.apply_transition(&pending).await?;
        self.store.remove_item(keys::SEASON_TRANSITION).await?;
        Ok(true)
    }

    /// The active season with its aggregates frozen, not yet persisted
    async fn archive_current(&self, end_date: &str) -> StorageResult<Option<Season>> {
        let Some(mut season) = self.get_active_season().await? else {
            return Ok(None);
        };

        let stats = self.season_stats(&season.id).await?;
        info!(
            "Archiving season {}: {} trees, {:.2} earned, {:.2} spent, {} days",
            season.id,
            stats.total_trees,
            stats.total_earnings,
            stats.total_expenses,
            stats.total_days
        );
        season.archive(&stats, end_date.to_string());
        Ok(Some(season))
    }

    async fn run_transition(&self, transition: SeasonTransition) -> StorageResult<()> {
        set_json(self.store.as_ref(), keys::SEASON_TRANSITION, &transition).await?;
        self.apply_transition(&transition).await?;
        self.store.remove_item(keys::SEASON_TRANSITION).await
    }

    async fn apply_transition(&self, transition: &SeasonTransition) -> StorageResult<()> {
        let mut seasons = self.get_seasons().await?;
        for season in transition.outgoing.iter().chain(transition.incoming.iter()) {
            match seasons.iter().position(|s| s.id == season.id) {
                Some(index) => seasons[index] = season.clone(),
                None => seasons.push(season.clone()),
            }
        }
        set_json(self.store.as_ref(), keys::SEASONS, &seasons).await?;

        match &transition.incoming {
            Some(season) => set_json(self.store.as_ref(), keys::ACTIVE_SEASON, season).await,
            None => self.store.remove_item(keys::ACTIVE_SEASON).await,
        }
    }
}
