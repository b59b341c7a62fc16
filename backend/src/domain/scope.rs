//! Which partition an entity operation reads and writes.

use std::fmt;

use crate::storage::keys;

/// Entity lists that are partitioned by season
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    TreeLogs,
    EarningsLogs,
    ExpenseLogs,
    Achievements,
}

impl Partition {
    fn legacy_key(&self) -> &'static str {
        match self {
            Partition::TreeLogs => keys::TREE_LOGS,
            Partition::EarningsLogs => keys::EARNINGS_LOGS,
            Partition::ExpenseLogs => keys::EXPENSE_LOGS,
            Partition::Achievements => keys::ACHIEVEMENTS,
        }
    }

    fn season_prefix(&self) -> &'static str {
        match self {
            Partition::TreeLogs => keys::SEASON_TREE_LOGS_PREFIX,
            Partition::EarningsLogs => keys::SEASON_EARNINGS_LOGS_PREFIX,
            Partition::ExpenseLogs => keys::SEASON_EXPENSE_LOGS_PREFIX,
            Partition::Achievements => keys::SEASON_ACHIEVEMENTS_PREFIX,
        }
    }
}

/// The unscoped legacy partition, or one season's partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Legacy,
    Season(String),
}

impl Scope {
    pub fn key(&self, partition: Partition) -> String {
        match self {
            Scope::Legacy => partition.legacy_key().to_string(),
            Scope::Season(season_id) => format!("{}{}", partition.season_prefix(), season_id),
        }
    }

    pub fn season_id(&self) -> Option<&str> {
        match self {
            Scope::Legacy => None,
            Scope::Season(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Legacy => write!(f, "legacy"),
            Scope::Season(id) => write!(f, "season {}", id),
        }
    }
}
