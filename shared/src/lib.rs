use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a unique record ID in format: "<kind>::<epoch_millis>::<suffix>"
///
/// The millisecond timestamp keeps IDs roughly sortable by creation time; the
/// random suffix keeps two records created in the same millisecond apart.
pub fn generate_id(kind: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}::{}::{}", kind, millis, &suffix[..8])
}

/// Kind of working day a tree log represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    #[default]
    Normal,
    Sick,
    Dayoff,
}

impl DayType {
    /// Whether the day counts toward a season's worked days
    pub fn is_working_day(&self) -> bool {
        matches!(self, DayType::Normal)
    }
}

/// Ground condition for an hour of planting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandType {
    #[default]
    Prepped,
    Raw,
}

/// One hour (or block) of planting inside a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyLog {
    pub id: String,
    /// Free-form locale time string, e.g. "7:00 AM"
    pub start_time: String,
    pub end_time: String,
    pub trees_planted: u32,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub land_type: LandType,
    #[serde(default)]
    pub bundles: u32,
    #[serde(default)]
    pub boxes: u32,
    #[serde(default)]
    pub trays: u32,
    #[serde(default)]
    pub individual_trees: u32,
}

impl HourlyLog {
    /// Rebuild the tree count from raw unit counts. Saturates at `u32::MAX`.
    pub fn trees_from_units(&self, settings: &TreeCountSettings) -> u32 {
        self.bundles
            .saturating_mul(settings.trees_per_bundle)
            .saturating_add(self.boxes.saturating_mul(settings.trees_per_box))
            .saturating_add(self.trays.saturating_mul(settings.trees_per_tray))
            .saturating_add(self.individual_trees)
    }
}

/// A single day of planting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeLog {
    pub id: String,
    /// Device-local calendar day, `YYYY-MM-DD`
    pub date: String,
    pub total_trees: u32,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub day_type: DayType,
    /// Chronological; older stored records may not carry this field at all
    #[serde(default)]
    pub hourly_logs: Vec<HourlyLog>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rate: Option<f64>,
}

impl TreeLog {
    pub fn new(date: impl Into<String>, total_trees: u32) -> Self {
        Self {
            id: generate_id("tree_log"),
            date: date.into(),
            total_trees,
            species: String::new(),
            province: String::new(),
            day_type: DayType::Normal,
            hourly_logs: Vec::new(),
            notes: String::new(),
            day_rating: None,
            average_rate: None,
        }
    }

    /// Sum of trees across the hourly entries
    pub fn hourly_total(&self) -> u32 {
        self.hourly_logs
            .iter()
            .fold(0u32, |total, h| total.saturating_add(h.trees_planted))
    }

    /// Coins awarded when this log is first created
    pub fn coins_earned(&self) -> u64 {
        u64::from(self.total_trees / 100)
    }

    /// Close out the day: the hourly entries become authoritative for the
    /// total and the average rate is derived from them.
    pub fn end_day(&mut self) {
        if self.hourly_logs.is_empty() {
            return;
        }
        self.total_trees = self.hourly_total();
        self.average_rate = Some(f64::from(self.total_trees) / self.hourly_logs.len() as f64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentType {
    Hourly,
    PerTree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsLog {
    pub id: String,
    pub date: String,
    pub amount: f64,
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trees_planted: Option<u32>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpenseCategory {
    Gear,
    Food,
    Transport,
    Accommodation,
    CampCosts,
    Other,
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExpenseCategory::Gear => "Gear",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Accommodation => "Accommodation",
            ExpenseCategory::CampCosts => "Camp Costs",
            ExpenseCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLog {
    pub id: String,
    pub date: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Rookie,
    Intermediate,
    Veteran,
    Highballer,
}

/// Minimum age accepted for a profile
pub const MINIMUM_AGE: u8 = 18;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProfileValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Planters must be at least 18 years old (got {0})")]
    Underage(u8),
}

/// The device owner's profile (one per device)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u8,
    pub province: String,
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub favorite_species: String,
    #[serde(default)]
    pub total_badges: u32,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProfileValidationError::EmptyName);
        }
        if self.age < MINIMUM_AGE {
            return Err(ProfileValidationError::Underage(self.age));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub progress: u32,
    pub target: u32,
    /// RFC 3339 timestamp; set once and never cleared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
}

impl Achievement {
    /// Record freshly computed progress. The first time progress reaches the
    /// target the unlock time is fixed; later regressions leave it in place.
    pub fn record_progress(&mut self, progress: u32, now: &str) {
        self.progress = progress;
        if self.unlocked_at.is_none() && progress >= self.target {
            self.unlocked_at = Some(now.to_string());
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// A planting season. Aggregates are frozen when the season is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: String,
    pub name: String,
    pub province: String,
    pub year: i32,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub total_trees: u64,
    #[serde(default)]
    pub total_earnings: f64,
    #[serde(default)]
    pub total_days: u32,
}

impl Season {
    pub fn display_name(province: &str, year: i32) -> String {
        format!("{} {}", province, year)
    }

    /// A fresh, active season with zeroed aggregates
    pub fn start(province: &str, year: i32, start_date: String) -> Self {
        Self {
            id: generate_id("season"),
            name: Self::display_name(province, year),
            province: province.to_string(),
            year,
            start_date,
            end_date: None,
            is_active: true,
            total_trees: 0,
            total_earnings: 0.0,
            total_days: 0,
        }
    }

    /// Freeze aggregates and mark the season inactive
    pub fn archive(&mut self, stats: &SeasonStats, end_date: String) {
        self.is_active = false;
        self.end_date = Some(end_date);
        self.total_trees = stats.total_trees;
        self.total_earnings = stats.total_earnings;
        self.total_days = stats.total_days;
    }
}

/// Aggregates over one season's (or the legacy) partitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStats {
    pub total_trees: u64,
    pub total_earnings: f64,
    pub total_expenses: f64,
    pub total_days: u32,
}

impl SeasonStats {
    pub fn compute(trees: &[TreeLog], earnings: &[EarningsLog], expenses: &[ExpenseLog]) -> Self {
        Self {
            total_trees: trees.iter().map(|l| u64::from(l.total_trees)).sum(),
            total_earnings: earnings.iter().map(|e| e.amount).sum(),
            total_expenses: expenses.iter().map(|e| e.amount).sum(),
            total_days: trees.iter().filter(|l| l.day_type.is_working_day()).count() as u32,
        }
    }
}

/// Global unit conversion constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeCountSettings {
    pub trees_per_bundle: u32,
    pub trees_per_box: u32,
    pub trees_per_tray: u32,
}

impl Default for TreeCountSettings {
    fn default() -> Self {
        Self {
            trees_per_bundle: 15,
            trees_per_box: 200,
            trees_per_tray: 112,
        }
    }
}

/// Per-day override of the unit conversion constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySettings {
    pub date: String,
    pub trees_per_bundle: u32,
    pub trees_per_box: u32,
    pub trees_per_tray: u32,
}

impl DaySettings {
    pub fn from_defaults(date: &str, defaults: &TreeCountSettings) -> Self {
        Self {
            date: date.to_string(),
            trees_per_bundle: defaults.trees_per_bundle,
            trees_per_box: defaults.trees_per_box,
            trees_per_tray: defaults.trees_per_tray,
        }
    }

    pub fn as_tree_count_settings(&self) -> TreeCountSettings {
        TreeCountSettings {
            trees_per_bundle: self.trees_per_bundle,
            trees_per_box: self.trees_per_box,
            trees_per_tray: self.trees_per_tray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// Equip slots on the cosmetics record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmeticSlot {
    AvatarFrame,
    Avatar,
    Icon,
    Emoji,
}

/// Coin balance and owned cosmetic items (one per device)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCosmetics {
    pub coins: u64,
    #[serde(default)]
    pub purchased_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_avatar_frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_emoji: Option<String>,
}

impl UserCosmetics {
    pub fn owns(&self, item_id: &str) -> bool {
        self.purchased_items.iter().any(|owned| owned == item_id)
    }

    pub fn slot_mut(&mut self, slot: CosmeticSlot) -> &mut Option<String> {
        match slot {
            CosmeticSlot::AvatarFrame => &mut self.equipped_avatar_frame,
            CosmeticSlot::Avatar => &mut self.equipped_avatar,
            CosmeticSlot::Icon => &mut self.equipped_icon,
            CosmeticSlot::Emoji => &mut self.equipped_emoji,
        }
    }

    pub fn equipped(&self, slot: CosmeticSlot) -> Option<&str> {
        match slot {
            CosmeticSlot::AvatarFrame => self.equipped_avatar_frame.as_deref(),
            CosmeticSlot::Avatar => self.equipped_avatar.as_deref(),
            CosmeticSlot::Icon => self.equipped_icon.as_deref(),
            CosmeticSlot::Emoji => self.equipped_emoji.as_deref(),
        }
    }
}

/// Everything the store holds, for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSnapshot {
    pub exported_at: String,
    pub profile: Option<UserProfile>,
    pub active_season: Option<Season>,
    pub seasons: Vec<Season>,
    pub legacy: PartitionSnapshot,
    pub season_partitions: Vec<SeasonPartitionSnapshot>,
    pub cosmetics: UserCosmetics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSnapshot {
    pub tree_logs: Vec<TreeLog>,
    pub earnings_logs: Vec<EarningsLog>,
    pub expense_logs: Vec<ExpenseLog>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonPartitionSnapshot {
    pub season_id: String,
    pub partition: PartitionSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(id: &str, trees: u32) -> HourlyLog {
        HourlyLog {
            id: id.to_string(),
            start_time: "7:00 AM".to_string(),
            end_time: "8:00 AM".to_string(),
            trees_planted: trees,
            species: "Spruce".to_string(),
            land_type: LandType::Prepped,
            bundles: 0,
            boxes: 0,
            trays: 0,
            individual_trees: 0,
        }
    }

    #[test]
    fn test_tree_log_without_hourly_logs_field_decodes() {
        let json = r#"{"id":"t1","date":"2024-05-01","totalTrees":1200,"dayType":"normal"}"#;
        let log: TreeLog = serde_json::from_str(json).unwrap();
        assert!(log.hourly_logs.is_empty());
        assert_eq!(log.total_trees, 1200);
    }

    #[test]
    fn test_end_day_derives_total_and_rate() {
        let mut log = TreeLog::new("2024-05-01", 0);
        log.hourly_logs = vec![hourly("h1", 100), hourly("h2", 150)];
        log.end_day();
        assert_eq!(log.total_trees, 250);
        assert_eq!(log.average_rate, Some(125.0));
    }

    #[test]
    fn test_end_day_without_hourly_logs_keeps_total() {
        let mut log = TreeLog::new("2024-05-01", 900);
        log.end_day();
        assert_eq!(log.total_trees, 900);
        assert_eq!(log.average_rate, None);
    }

    #[test]
    fn test_coins_earned_floors() {
        assert_eq!(TreeLog::new("2024-05-01", 250).coins_earned(), 2);
        assert_eq!(TreeLog::new("2024-05-01", 99).coins_earned(), 0);
    }

    #[test]
    fn test_trees_from_units() {
        let mut h = hourly("h1", 0);
        h.bundles = 2;
        h.boxes = 1;
        h.individual_trees = 5;
        assert_eq!(h.trees_from_units(&TreeCountSettings::default()), 30 + 200 + 5);
    }

    #[test]
    fn test_large_unit_counts_saturate() {
        let mut h = hourly("h1", 0);
        h.bundles = 300_000_000;
        h.boxes = 1;
        assert_eq!(h.trees_from_units(&TreeCountSettings::default()), u32::MAX);

        let mut log = TreeLog::new("2024-05-01", 0);
        log.hourly_logs = vec![hourly("h1", u32::MAX - 10), hourly("h2", 100)];
        assert_eq!(log.hourly_total(), u32::MAX);
    }

    #[test]
    fn test_achievement_unlock_is_monotonic() {
        let mut a = Achievement {
            id: "first_thousand".to_string(),
            title: "First Thousand".to_string(),
            description: "Plant 1000 trees".to_string(),
            icon: "🌲".to_string(),
            progress: 0,
            target: 1000,
            unlocked_at: None,
        };
        a.record_progress(500, "2024-05-01T10:00:00Z");
        assert!(!a.is_unlocked());
        a.record_progress(1000, "2024-05-02T10:00:00Z");
        assert_eq!(a.unlocked_at.as_deref(), Some("2024-05-02T10:00:00Z"));
        a.record_progress(200, "2024-05-03T10:00:00Z");
        assert_eq!(a.progress, 200);
        assert_eq!(a.unlocked_at.as_deref(), Some("2024-05-02T10:00:00Z"));
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = UserProfile {
            name: "Sam".to_string(),
            age: 17,
            province: "BC".to_string(),
            experience_level: ExperienceLevel::Rookie,
            favorite_species: String::new(),
            total_badges: 0,
            achievements: Vec::new(),
        };
        assert_eq!(profile.validate(), Err(ProfileValidationError::Underage(17)));
        profile.age = 18;
        assert!(profile.validate().is_ok());
        profile.name = "  ".to_string();
        assert_eq!(profile.validate(), Err(ProfileValidationError::EmptyName));
    }

    #[test]
    fn test_season_stats_skip_sick_and_dayoff() {
        let mut sick = TreeLog::new("2024-05-02", 200);
        sick.day_type = DayType::Sick;
        let mut off = TreeLog::new("2024-05-03", 0);
        off.day_type = DayType::Dayoff;
        let trees = vec![TreeLog::new("2024-05-01", 100), sick, off];
        let stats = SeasonStats::compute(&trees, &[], &[]);
        assert_eq!(stats.total_trees, 300);
        assert_eq!(stats.total_days, 1);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentType::PerTree).unwrap(), "\"per-tree\"");
        assert_eq!(serde_json::to_string(&DayType::Dayoff).unwrap(), "\"dayoff\"");
        assert_eq!(serde_json::to_string(&ExpenseCategory::CampCosts).unwrap(), "\"camp-costs\"");
    }

    #[test]
    fn test_generate_id_is_unique() {
        assert_ne!(generate_id("season"), generate_id("season"));
        assert!(generate_id("season").starts_with("season::"));
    }
}
