//! Season-aware record store.
//!
//! The single entry point for every domain entity. Tree, earnings and expense
//! logs plus achievements live in partitions: the active season's partition
//! when a season is active, otherwise the legacy unscoped one. Each
//! convenience accessor here reads `@active_season` afresh and delegates to a
//! `ScopedRepository` for that scope, so switching seasons redirects the very
//! next call. Callers that already know their scope can hold a
//! `ScopedRepository` from `scoped()` instead.
//!
//! Profile, display preferences and unit conversion settings are not
//! season-scoped.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use shared::{
    Achievement, DataSnapshot, DaySettings, EarningsLog, ExpenseLog, HourlyLog, Season,
    SeasonPartitionSnapshot, ThemeMode, TreeCountSettings, TreeLog, UserProfile,
};

use super::cosmetics_service::CosmeticsStore;
use super::scope::Scope;
use super::scoped_repository::{SaveOutcome, ScopedRepository};
use super::season_service::SeasonService;
use crate::storage::{get_json, keys, set_json, KeyValueStore, StorageResult};

#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn KeyValueStore>,
    cosmetics: CosmeticsStore,
    seasons: SeasonService,
    partition_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let cosmetics = CosmeticsStore::new(store.clone());
        let partition_lock = Arc::new(Mutex::new(()));
        let seasons = SeasonService::new(store.clone(), cosmetics.clone(), partition_lock.clone());
        Self {
            store,
            cosmetics,
            seasons,
            partition_lock,
        }
    }

    pub fn cosmetics(&self) -> &CosmeticsStore {
        &self.cosmetics
    }

    pub fn seasons(&self) -> &SeasonService {
        &self.seasons
    }

    /// Repository pinned to an explicit scope
    pub fn scoped(&self, scope: Scope) -> ScopedRepository {
        ScopedRepository::new(
            self.store.clone(),
            self.cosmetics.clone(),
            self.partition_lock.clone(),
            scope,
        )
    }

    /// Scope of the season active right now. Never cached.
    pub async fn current_scope(&self) -> StorageResult<Scope> {
        let scope = match self.seasons.get_active_season().await? {
            Some(season) => Scope::Season(season.id),
            None => Scope::Legacy,
        };
        debug!("Resolved partition scope: {}", scope);
        Ok(scope)
    }

    /// Repository for the season active right now
    pub async fn active_repository(&self) -> StorageResult<ScopedRepository> {
        Ok(self.scoped(self.current_scope().await?))
    }

    // ---- season-scoped entities ----
    //
    // Writes hold the partition lock across resolving the active season and
    // the write itself, so a season transition cannot archive the resolved
    // season in between.

    pub async fn get_tree_logs(&self) -> StorageResult<Vec<TreeLog>> {
        self.active_repository().await?.get_tree_logs().await
    }

    pub async fn save_tree_log(&self, log: &TreeLog) -> StorageResult<SaveOutcome> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.save_tree_log_locked(log).await
    }

    pub async fn delete_tree_log(&self, id: &str) -> StorageResult<bool> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.delete_tree_log_locked(id).await
    }

    pub async fn delete_hourly_log(
        &self,
        log_id: &str,
        hourly_log_id: &str,
    ) -> StorageResult<bool> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository()
            .await?
            .delete_hourly_log_locked(log_id, hourly_log_id)
            .await
    }

    pub async fn save_hourly_log(
        &self,
        log_id: &str,
        hourly: &HourlyLog,
    ) -> StorageResult<TreeLog> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository()
            .await?
            .save_hourly_log_locked(log_id, hourly)
            .await
    }

    pub async fn get_earnings_logs(&self) -> StorageResult<Vec<EarningsLog>> {
        self.active_repository().await?.get_earnings_logs().await
    }

    pub async fn save_earnings_log(&self, log: &EarningsLog) -> StorageResult<SaveOutcome> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.save_earnings_log_locked(log).await
    }

    pub async fn delete_earnings_log(&self, id: &str) -> StorageResult<bool> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.delete_earnings_log_locked(id).await
    }

    pub async fn get_expense_logs(&self) -> StorageResult<Vec<ExpenseLog>> {
        self.active_repository().await?.get_expense_logs().await
    }

    pub async fn save_expense_log(&self, log: &ExpenseLog) -> StorageResult<SaveOutcome> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.save_expense_log_locked(log).await
    }

    pub async fn delete_expense_log(&self, id: &str) -> StorageResult<bool> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository().await?.delete_expense_log_locked(id).await
    }

    pub async fn get_achievements(&self) -> StorageResult<Vec<Achievement>> {
        self.active_repository().await?.get_achievements().await
    }

    pub async fn save_achievements(&self, achievements: &[Achievement]) -> StorageResult<()> {
        let _partitions = self.partition_lock.lock().await;
        self.active_repository()
            .await?
            .save_achievements_locked(achievements)
            .await
    }

    pub async fn create_new_season(&self, province: &str, year: i32) -> StorageResult<Season> {
        self.seasons.create_new_season(province, year).await
    }

    // ---- unscoped records ----

    pub async fn get_user_profile(&self) -> StorageResult<Option<UserProfile>> {
        get_json(self.store.as_ref(), keys::USER_PROFILE).await
    }

    /// Validate and store the profile
    pub async fn save_user_profile(&self, profile: &UserProfile) -> StorageResult<()> {
        profile.validate()?;
        set_json(self.store.as_ref(), keys::USER_PROFILE, profile).await?;
        info!("Saved profile for {}", profile.name);
        Ok(())
    }

    pub async fn get_theme_mode(&self) -> StorageResult<ThemeMode> {
        Ok(get_json(self.store.as_ref(), keys::THEME_MODE)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_theme_mode(&self, mode: ThemeMode) -> StorageResult<()> {
        set_json(self.store.as_ref(), keys::THEME_MODE, &mode).await
    }

    pub async fn get_selected_theme(&self) -> StorageResult<Option<String>> {
        get_json(self.store.as_ref(), keys::SELECTED_THEME).await
    }

    pub async fn save_selected_theme(&self, theme: &str) -> StorageResult<()> {
        set_json(self.store.as_ref(), keys::SELECTED_THEME, theme).await
    }

    pub async fn get_tree_count_settings(&self) -> StorageResult<TreeCountSettings> {
        Ok(get_json(self.store.as_ref(), keys::TREE_COUNT_SETTINGS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_tree_count_settings(
        &self,
        settings: &TreeCountSettings,
    ) -> StorageResult<()> {
        set_json(self.store.as_ref(), keys::TREE_COUNT_SETTINGS, settings).await
    }

    /// Per-day constants, falling back to the global settings for days
    /// without an override
    pub async fn get_day_settings(&self, date: &str) -> StorageResult<DaySettings> {
        match get_json(self.store.as_ref(), &keys::day_settings(date)).await? {
            Some(settings) => Ok(settings),
            None => {
                let defaults = self.get_tree_count_settings().await?;
                Ok(DaySettings::from_defaults(date, &defaults))
            }
        }
    }

    /// Trees in an hourly entry, rebuilt from its unit counts with the
    /// constants in effect on `date`
    pub async fn count_hourly_trees(&self, date: &str, hourly: &HourlyLog) -> StorageResult<u32> {
        let settings = self.get_day_settings(date).await?;
        Ok(hourly.trees_from_units(&settings.as_tree_count_settings()))
    }

    pub async fn save_day_settings(&self, settings: &DaySettings) -> StorageResult<()> {
        set_json(self.store.as_ref(), &keys::day_settings(&settings.date), settings).await
    }

    /// Remove every stored key except the display preferences. Irreversible.
    pub async fn erase_all_data(&self) -> StorageResult<usize> {
        let _partitions = self.partition_lock.lock().await;
        let doomed: Vec<String> = self
            .store
            .get_all_keys()
            .await?
            .into_iter()
            .filter(|key| !keys::PRESERVED_ON_ERASE.iter().any(|kept| *kept == key.as_str()))
            .collect();

        self.store.multi_remove(&doomed).await?;
        info!("Erased {} keys", doomed.len());
        Ok(doomed.len())
    }

    /// Everything the store holds, for export
    pub async fn export_snapshot(&self) -> StorageResult<DataSnapshot> {
        let seasons = self.seasons.get_seasons().await?;
        let mut season_partitions = Vec::with_capacity(seasons.len());
        for season in &seasons {
            season_partitions.push(SeasonPartitionSnapshot {
                season_id: season.id.clone(),
                partition: self.scoped(Scope::Season(season.id.clone())).snapshot().await?,
            });
        }

        Ok(DataSnapshot {
            exported_at: Utc::now().to_rfc3339(),
            profile: self.get_user_profile().await?,
            active_season: self.seasons.get_active_season().await?,
            seasons,
            legacy: self.scoped(Scope::Legacy).snapshot().await?,
            season_partitions,
            cosmetics: self.cosmetics.get_user_cosmetics().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_utils::TestEnvironment;
    use crate::storage::StorageError;
    use shared::{DayType, ExpenseCategory, ExperienceLevel, PaymentType};
    use std::time::Duration;

    fn earnings(id: &str, amount: f64) -> EarningsLog {
        EarningsLog {
            id: id.to_string(),
            date: "2024-05-01".to_string(),
            amount,
            payment_type: PaymentType::Hourly,
            hours_worked: Some(8.0),
            trees_planted: None,
            notes: String::new(),
        }
    }

    fn expense(id: &str, amount: f64) -> ExpenseLog {
        ExpenseLog {
            id: id.to_string(),
            date: "2024-05-01".to_string(),
            amount,
            category: ExpenseCategory::Gear,
            description: "Shovel".to_string(),
        }
    }

    fn achievement(id: &str) -> Achievement {
        Achievement {
            id: id.to_string(),
            title: "First Day".to_string(),
            description: "Log your first day".to_string(),
            icon: "🌱".to_string(),
            progress: 1,
            target: 1,
            unlocked_at: Some("2024-05-01T00:00:00Z".to_string()),
        }
    }

    #[tokio::test]
    async fn test_routing_follows_active_season() {
        let env = TestEnvironment::new();
        let store = &env.record_store;

        let legacy_log = TreeLog::new("2023-06-01", 800);
        store.save_tree_log(&legacy_log).await.unwrap();
        store.save_earnings_log(&earnings("legacy", 100.0)).await.unwrap();
        store.save_expense_log(&expense("legacy", 30.0)).await.unwrap();
        store.save_achievements(&[achievement("legacy")]).await.unwrap();

        let season = store.create_new_season("BC", 2024).await.unwrap();
        assert_eq!(store.current_scope().await.unwrap(), Scope::Season(season.id.clone()));
        assert!(store.get_tree_logs().await.unwrap().is_empty());
        assert!(store.get_earnings_logs().await.unwrap().is_empty());
        assert!(store.get_expense_logs().await.unwrap().is_empty());
        assert!(store.get_achievements().await.unwrap().is_empty());

        let season_log = TreeLog::new("2024-05-01", 1200);
        store.save_tree_log(&season_log).await.unwrap();
        store.save_earnings_log(&earnings("season", 250.0)).await.unwrap();
        store.save_expense_log(&expense("season", 60.0)).await.unwrap();
        store.save_achievements(&[achievement("season")]).await.unwrap();

        let logs = store.get_tree_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, season_log.id);
        assert_eq!(store.get_expense_logs().await.unwrap()[0].id, "season");
        assert!(env.raw(&format!("@season_tree_logs_{}", season.id)).await.is_some());
        assert!(env.raw(&format!("@season_expense_logs_{}", season.id)).await.is_some());

        // Leaving the season redirects the next call back to legacy data
        store.seasons().archive_active_season().await.unwrap();
        let logs = store.get_tree_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, legacy_log.id);
        assert_eq!(store.get_earnings_logs().await.unwrap()[0].id, "legacy");
        let legacy_expenses = store.get_expense_logs().await.unwrap();
        assert_eq!(legacy_expenses.len(), 1);
        assert_eq!(legacy_expenses[0].id, "legacy");
        assert_eq!(store.get_achievements().await.unwrap()[0].id, "legacy");
    }

    #[tokio::test]
    async fn test_save_queued_behind_season_change_lands_in_new_season() {
        let env = TestEnvironment::new();
        let store = env.record_store.clone();
        let old = store.create_new_season("BC", 2023).await.unwrap();

        let held = store.partition_lock.lock().await;
        let creating = tokio::spawn({
            let store = store.clone();
            async move { store.create_new_season("BC", 2024).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let saving = tokio::spawn({
            let store = store.clone();
            async move { store.save_tree_log(&TreeLog::new("2024-05-01", 500)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        let new = creating.await.unwrap().unwrap();
        saving.await.unwrap().unwrap();

        let seasons = store.seasons().get_seasons().await.unwrap();
        let archived = seasons.iter().find(|s| s.id == old.id).unwrap();
        let old_logs = store.scoped(Scope::Season(old.id.clone())).get_tree_logs().await.unwrap();
        let old_total: u64 = old_logs.iter().map(|l| u64::from(l.total_trees)).sum();
        assert_eq!(archived.total_trees, old_total);
        assert!(old_logs.is_empty());
        assert_eq!(store.get_tree_logs().await.unwrap().len(), 1);
        assert_eq!(store.current_scope().await.unwrap(), Scope::Season(new.id));
    }

    #[tokio::test]
    async fn test_archive_snapshot_through_store() {
        let env = TestEnvironment::new();
        let store = &env.record_store;
        let old = store.create_new_season("BC", 2023).await.unwrap();

        let mut sick = TreeLog::new("2023-05-03", 300);
        sick.day_type = DayType::Sick;
        for log in [TreeLog::new("2023-05-01", 100), TreeLog::new("2023-05-02", 200), sick] {
            store.save_tree_log(&log).await.unwrap();
        }
        store.save_earnings_log(&earnings("e1", 400.0)).await.unwrap();

        let new = store.create_new_season("BC", 2024).await.unwrap();
        assert_eq!(new.total_trees, 0);
        assert!(new.is_active);

        let seasons = store.seasons().get_seasons().await.unwrap();
        let archived = seasons.iter().find(|s| s.id == old.id).unwrap();
        assert_eq!(archived.total_trees, 600);
        assert_eq!(archived.total_days, 2);
        assert_eq!(archived.total_earnings, 400.0);
        assert!(!archived.is_active);
        assert!(archived.end_date.is_some());
    }

    #[tokio::test]
    async fn test_one_shot_reward_through_store() {
        let env = TestEnvironment::new();
        let store = &env.record_store;
        let mut log = TreeLog::new("2024-05-01", 250);
        assert_eq!(store.save_tree_log(&log).await.unwrap(), SaveOutcome::Created);
        assert_eq!(store.cosmetics().get_user_cosmetics().await.unwrap().coins, 2);

        log.total_trees = 999;
        assert_eq!(store.save_tree_log(&log).await.unwrap(), SaveOutcome::Updated);
        assert_eq!(store.cosmetics().get_user_cosmetics().await.unwrap().coins, 2);
    }

    #[tokio::test]
    async fn test_erase_all_keeps_display_preferences() {
        let env = TestEnvironment::new();
        let store = &env.record_store;

        store.save_theme_mode(ThemeMode::Dark).await.unwrap();
        store.save_selected_theme("forest").await.unwrap();
        store.create_new_season("BC", 2024).await.unwrap();
        store.save_tree_log(&TreeLog::new("2024-05-01", 500)).await.unwrap();
        store.save_tree_count_settings(&TreeCountSettings::default()).await.unwrap();

        let erased = store.erase_all_data().await.unwrap();
        assert!(erased > 0);

        let mut remaining = env.keys().await;
        remaining.sort();
        assert_eq!(remaining, vec!["@selected_theme".to_string(), "@theme_mode".to_string()]);
        assert_eq!(store.get_theme_mode().await.unwrap(), ThemeMode::Dark);
        assert_eq!(store.get_selected_theme().await.unwrap().as_deref(), Some("forest"));
        assert_eq!(store.cosmetics().get_user_cosmetics().await.unwrap().coins, 0);
        assert_eq!(store.current_scope().await.unwrap(), Scope::Legacy);
    }

    #[tokio::test]
    async fn test_profile_is_validated() {
        let env = TestEnvironment::new();
        let store = &env.record_store;
        assert_eq!(store.get_user_profile().await.unwrap(), None);

        let mut profile = UserProfile {
            name: "Robin".to_string(),
            age: 16,
            province: "BC".to_string(),
            experience_level: ExperienceLevel::Rookie,
            favorite_species: "Spruce".to_string(),
            total_badges: 0,
            achievements: Vec::new(),
        };
        let result = store.save_user_profile(&profile).await;
        assert!(matches!(result, Err(StorageError::Validation(_))));
        assert_eq!(store.get_user_profile().await.unwrap(), None);

        profile.age = 19;
        store.save_user_profile(&profile).await.unwrap();
        assert_eq!(store.get_user_profile().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_day_settings_fall_back_to_global() {
        let env = TestEnvironment::new();
        let store = &env.record_store;

        let fallback = store.get_day_settings("2024-05-01").await.unwrap();
        assert_eq!(fallback.trees_per_box, TreeCountSettings::default().trees_per_box);

        store
            .save_tree_count_settings(&TreeCountSettings {
                trees_per_bundle: 20,
                trees_per_box: 250,
                trees_per_tray: 98,
            })
            .await
            .unwrap();
        assert_eq!(store.get_day_settings("2024-05-01").await.unwrap().trees_per_bundle, 20);

        let override_day = DaySettings {
            date: "2024-05-02".to_string(),
            trees_per_bundle: 10,
            trees_per_box: 300,
            trees_per_tray: 60,
        };
        store.save_day_settings(&override_day).await.unwrap();
        assert_eq!(store.get_day_settings("2024-05-02").await.unwrap(), override_day);
        assert_eq!(store.get_day_settings("2024-05-01").await.unwrap().trees_per_box, 250);
    }

    #[tokio::test]
    async fn test_count_hourly_trees_uses_day_override() {
        let env = TestEnvironment::new();
        let store = &env.record_store;
        store
            .save_day_settings(&DaySettings {
                date: "2024-05-02".to_string(),
                trees_per_bundle: 10,
                trees_per_box: 300,
                trees_per_tray: 60,
            })
            .await
            .unwrap();

        let hourly = HourlyLog {
            id: "h1".to_string(),
            start_time: "7:00 AM".to_string(),
            end_time: "8:00 AM".to_string(),
            trees_planted: 0,
            species: "Spruce".to_string(),
            land_type: shared::LandType::Prepped,
            bundles: 3,
            boxes: 1,
            trays: 0,
            individual_trees: 4,
        };
        assert_eq!(store.count_hourly_trees("2024-05-02", &hourly).await.unwrap(), 30 + 300 + 4);
        assert_eq!(store.count_hourly_trees("2024-05-01", &hourly).await.unwrap(), 45 + 200 + 4);
    }

    #[tokio::test]
    async fn test_theme_defaults() {
        let env = TestEnvironment::new();
        assert_eq!(env.record_store.get_theme_mode().await.unwrap(), ThemeMode::System);
        assert_eq!(env.record_store.get_selected_theme().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_partition_is_an_error_not_empty() {
        let env = TestEnvironment::new();
        env.set_raw("@tree_planting_logs", "not json").await;
        let result = env.record_store.get_tree_logs().await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_export_snapshot_covers_every_partition() {
        let env = TestEnvironment::new();
        let store = &env.record_store;
        store.save_tree_log(&TreeLog::new("2023-06-01", 100)).await.unwrap();
        let season = store.create_new_season("QC", 2024).await.unwrap();
        store.save_tree_log(&TreeLog::new("2024-05-01", 300)).await.unwrap();

        let snapshot = store.export_snapshot().await.unwrap();
        assert_eq!(snapshot.legacy.tree_logs.len(), 1);
        assert_eq!(snapshot.seasons.len(), 1);
        assert_eq!(
            snapshot.active_season.as_ref().map(|s| s.id.clone()),
            Some(season.id.clone())
        );
        assert_eq!(snapshot.season_partitions[0].season_id, season.id);
        assert_eq!(snapshot.season_partitions[0].partition.tree_logs.len(), 1);
        assert_eq!(snapshot.cosmetics.coins, 1 + 3);
        assert!(serde_json::to_string(&snapshot).is_ok());
    }
}
