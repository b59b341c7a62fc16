//! Entity operations pinned to one explicit partition scope.
//!
//! A `ScopedRepository` never looks at the active season; whoever builds it
//! decides which partition it touches. `RecordStore` builds one per call from
//! the current active season, and season archival builds one for the outgoing
//! season directly.
//!
//! All list mutations run under the write lock shared with the owning
//! `RecordStore`, so two overlapping upserts cannot clobber each other.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared::{
    Achievement, EarningsLog, ExpenseLog, HourlyLog, PartitionSnapshot, SeasonStats, TreeLog,
};

use super::cosmetics_service::CosmeticsStore;
use super::scope::{Partition, Scope};
use crate::storage::{get_json_list, set_json, KeyValueStore, StorageError, StorageResult};

/// Whether an upsert appended a new record or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Replace the element with the same id in place, or append it
fn upsert_by_id<T>(items: &mut Vec<T>, item: T, id_of: impl Fn(&T) -> &str) -> SaveOutcome {
    match items.iter().position(|existing| id_of(existing) == id_of(&item)) {
        Some(index) => {
            items[index] = item;
            SaveOutcome::Updated
        }
        None => {
            items.push(item);
            SaveOutcome::Created
        }
    }
}

/// Drop the element with `id`; returns whether one was removed
fn remove_by_id<T>(items: &mut Vec<T>, id: &str, id_of: impl Fn(&T) -> &str) -> bool {
    let before = items.len();
    items.retain(|existing| id_of(existing) != id);
    items.len() != before
}

#[derive(Clone)]
pub struct ScopedRepository {
    store: Arc<dyn KeyValueStore>,
    cosmetics: CosmeticsStore,
    write_lock: Arc<Mutex<()>>,
    scope: Scope,
}

impl ScopedRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cosmetics: CosmeticsStore,
        write_lock: Arc<Mutex<()>>,
        scope: Scope,
    ) -> Self {
        Self {
            store,
            cosmetics,
            write_lock,
            scope,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        partition: Partition,
    ) -> StorageResult<Vec<T>> {
        let key = self.scope.key(partition);
        get_json_list(self.store.as_ref(), &key).await.map_err(|e| {
            warn!("Failed to read {} for {}: {}", key, self.scope, e);
            e
        })
    }

    async fn write<T: serde::Serialize + Sync>(
        &self,
        partition: Partition,
        items: &[T],
    ) -> StorageResult<()> {
        let key = self.scope.key(partition);
        set_json(self.store.as_ref(), &key, items).await.map_err(|e| {
            warn!("Failed to write {} for {}: {}", key, self.scope, e);
            e
        })
    }

    // ---- tree logs ----
    //
    // Each mutator takes the partition write lock. The `*_locked` variants
    // assume the caller already holds it, so `RecordStore` can resolve the
    // active season and write under one guard.

    /// All tree logs in this scope
    pub async fn get_tree_logs(&self) -> StorageResult<Vec<TreeLog>> {
        self.read(Partition::TreeLogs).await
    }

    /// Upsert a tree log. A newly created log earns `floor(total_trees / 100)`
    /// coins; edits to an existing log never earn coins.
    pub async fn save_tree_log(&self, log: &TreeLog) -> StorageResult<SaveOutcome> {
        let _guard = self.write_lock.lock().await;
        self.save_tree_log_locked(log).await
    }

    pub(crate) async fn save_tree_log_locked(&self, log: &TreeLog) -> StorageResult<SaveOutcome> {
        self.store_tree_log(log.clone()).await
    }

    async fn store_tree_log(&self, log: TreeLog) -> StorageResult<SaveOutcome> {
        let mut logs: Vec<TreeLog> = self.read(Partition::TreeLogs).await?;
        let coins_earned = log.coins_earned();
        let log_id = log.id.clone();
        let outcome = upsert_by_id(&mut logs, log, |l| l.id.as_str());
        self.write(Partition::TreeLogs, &logs).await?;

        if outcome == SaveOutcome::Created && coins_earned > 0 {
            self.cosmetics.add_coins(coins_earned).await?;
            info!("Tree log {} earned {} coins", log_id, coins_earned);
        }
        debug!("Saved tree log {} in {} ({:?})", log_id, self.scope, outcome);
        Ok(outcome)
    }

    pub async fn delete_tree_log(&self, id: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.delete_tree_log_locked(id).await
    }

    pub(crate) async fn delete_tree_log_locked(&self, id: &str) -> StorageResult<bool> {
        let mut logs: Vec<TreeLog> = self.read(Partition::TreeLogs).await?;
        let removed = remove_by_id(&mut logs, id, |l| l.id.as_str());
        if removed {
            self.write(Partition::TreeLogs, &logs).await?;
            info!("Deleted tree log {} from {}", id, self.scope);
        }
        Ok(removed)
    }

    /// Remove one hourly entry and recompute the parent's total from what
    /// remains. A missing parent or entry leaves the partition untouched.
    pub async fn delete_hourly_log(
        &self,
        log_id: &str,
        hourly_log_id: &str,
    ) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.delete_hourly_log_locked(log_id, hourly_log_id).await
    }

    pub(crate) async fn delete_hourly_log_locked(
        &self,
        log_id: &str,
        hourly_log_id: &str,
    ) -> StorageResult<bool> {
        let logs: Vec<TreeLog> = self.read(Partition::TreeLogs).await?;
        let Some(mut parent) = logs.into_iter().find(|l| l.id == log_id) else {
            warn!("Cannot delete hourly log {}: tree log {} not found", hourly_log_id, log_id);
            return Ok(false);
        };

        if !remove_by_id(&mut parent.hourly_logs, hourly_log_id, |h| h.id.as_str()) {
            warn!("Hourly log {} not found in tree log {}", hourly_log_id, log_id);
            return Ok(false);
        }
        parent.total_trees = parent.hourly_total();

        self.store_tree_log(parent).await?;
        Ok(true)
    }

    /// Upsert an hourly entry into its parent log and recompute the total.
    /// Returns the updated parent.
    pub async fn save_hourly_log(
        &self,
        log_id: &str,
        hourly: &HourlyLog,
    ) -> StorageResult<TreeLog> {
        let _guard = self.write_lock.lock().await;
        self.save_hourly_log_locked(log_id, hourly).await
    }

    pub(crate) async fn save_hourly_log_locked(
        &self,
        log_id: &str,
        hourly: &HourlyLog,
    ) -> StorageResult<TreeLog> {
        let logs: Vec<TreeLog> = self.read(Partition::TreeLogs).await?;
        let mut parent = logs
            .into_iter()
            .find(|l| l.id == log_id)
            .ok_or_else(|| StorageError::NotFound(format!("tree log {}", log_id)))?;

        upsert_by_id(&mut parent.hourly_logs, hourly.clone(), |h| h.id.as_str());
        parent.total_trees = parent.hourly_total();

        self.store_tree_log(parent.clone()).await?;
        Ok(parent)
    }

    // ---- earnings ----

    pub async fn get_earnings_logs(&self) -> StorageResult<Vec<EarningsLog>> {
        self.read(Partition::EarningsLogs).await
    }

    pub async fn save_earnings_log(&self, log: &EarningsLog) -> StorageResult<SaveOutcome> {
        let _guard = self.write_lock.lock().await;
        self.save_earnings_log_locked(log).await
    }

    pub(crate) async fn save_earnings_log_locked(
        &self,
        log: &EarningsLog,
    ) -> StorageResult<SaveOutcome> {
        let mut logs: Vec<EarningsLog> = self.read(Partition::EarningsLogs).await?;
        let outcome = upsert_by_id(&mut logs, log.clone(), |l| l.id.as_str());
        self.write(Partition::EarningsLogs, &logs).await?;
        debug!("Saved earnings log {} in {} ({:?})", log.id, self.scope, outcome);
        Ok(outcome)
    }

    pub async fn delete_earnings_log(&self, id: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.delete_earnings_log_locked(id).await
    }

    pub(crate) async fn delete_earnings_log_locked(&self, id: &str) -> StorageResult<bool> {
        let mut logs: Vec<EarningsLog> = self.read(Partition::EarningsLogs).await?;
        let removed = remove_by_id(&mut logs, id, |l| l.id.as_str());
        if removed {
            self.write(Partition::EarningsLogs, &logs).await?;
        }
        Ok(removed)
    }

    // ---- expenses ----

    pub async fn get_expense_logs(&self) -> StorageResult<Vec<ExpenseLog>> {
        self.read(Partition::ExpenseLogs).await
    }

    pub async fn save_expense_log(&self, log: &ExpenseLog) -> StorageResult<SaveOutcome> {
        let _guard = self.write_lock.lock().await;
        self.save_expense_log_locked(log).await
    }

    pub(crate) async fn save_expense_log_locked(
        &self,
        log: &ExpenseLog,
    ) -> StorageResult<SaveOutcome> {
        let mut logs: Vec<ExpenseLog> = self.read(Partition::ExpenseLogs).await?;
        let outcome = upsert_by_id(&mut logs, log.clone(), |l| l.id.as_str());
        self.write(Partition::ExpenseLogs, &logs).await?;
        debug!("Saved expense log {} in {} ({:?})", log.id, self.scope, outcome);
        Ok(outcome)
    }

    pub async fn delete_expense_log(&self, id: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.delete_expense_log_locked(id).await
    }

    pub(crate) async fn delete_expense_log_locked(&self, id: &str) -> StorageResult<bool> {
        let mut logs: Vec<ExpenseLog> = self.read(Partition::ExpenseLogs).await?;
        let removed = remove_by_id(&mut logs, id, |l| l.id.as_str());
        if removed {
            self.write(Partition::ExpenseLogs, &logs).await?;
        }
        Ok(removed)
    }

    // ---- achievements ----

    pub async fn get_achievements(&self) -> StorageResult<Vec<Achievement>> {
        self.read(Partition::Achievements).await
    }

    /// Store the list as given; progress is computed by the caller
    pub async fn save_achievements(&self, achievements: &[Achievement]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save_achievements_locked(achievements).await
    }

    pub(crate) async fn save_achievements_locked(
        &self,
        achievements: &[Achievement],
    ) -> StorageResult<()> {
        self.write(Partition::Achievements, achievements).await
    }

    // ---- aggregates ----

    pub async fn season_stats(&self) -> StorageResult<SeasonStats> {
        let trees = self.get_tree_logs().await?;
        let earnings = self.get_earnings_logs().await?;
        let expenses = self.get_expense_logs().await?;
        Ok(SeasonStats::compute(&trees, &earnings, &expenses))
    }

    pub async fn snapshot(&self) -> StorageResult<PartitionSnapshot> {
        Ok(PartitionSnapshot {
            tree_logs: self.get_tree_logs().await?,
            earnings_logs: self.get_earnings_logs().await?,
            expense_logs: self.get_expense_logs().await?,
            achievements: self.get_achievements().await?,
        })
    }
}
