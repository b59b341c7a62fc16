//! Persisted key layout. One flat namespace, grouped by `@` prefixes.

pub const TREE_LOGS: &str = "@tree_planting_logs";
pub const EARNINGS_LOGS: &str = "@earnings_logs";
pub const EXPENSE_LOGS: &str = "@expense_logs";
pub const ACHIEVEMENTS: &str = "@achievements";
pub const USER_PROFILE: &str = "@user_profile";
pub const THEME_MODE: &str = "@theme_mode";
pub const SELECTED_THEME: &str = "@selected_theme";
pub const TREE_COUNT_SETTINGS: &str = "@tree_count_settings";
pub const DAY_SETTINGS_PREFIX: &str = "@day_settings_";
pub const SEASONS: &str = "@seasons";
pub const ACTIVE_SEASON: &str = "@active_season";
pub const SEASON_TRANSITION: &str = "@season_transition";
pub const USER_COSMETICS: &str = "@user_cosmetics";

pub const SEASON_TREE_LOGS_PREFIX: &str = "@season_tree_logs_";
pub const SEASON_EARNINGS_LOGS_PREFIX: &str = "@season_earnings_logs_";
pub const SEASON_EXPENSE_LOGS_PREFIX: &str = "@season_expense_logs_";
pub const SEASON_ACHIEVEMENTS_PREFIX: &str = "@season_achievements_";

/// Keys that survive an erase-all
pub const PRESERVED_ON_ERASE: [&str; 2] = [THEME_MODE, SELECTED_THEME];

pub fn day_settings(date: &str) -> String {
    format!("{}{}", DAY_SETTINGS_PREFIX, date)
}
