//! # Domain Module
//!
//! Business rules for the tree planting log, on top of the storage layer.
//!
//! ## Module Organization
//!
//! - **scope**: which partition (legacy or a season) an entity operation uses
//! - **scoped_repository**: tree/earnings/expense logs and achievements for one scope
//! - **record_store**: the season-aware entry point plus unscoped records
//! - **season_service**: season creation, archival and switching
//! - **cosmetics_service**: coin balance and cosmetic purchases
//!
//! ## Business Rules
//!
//! - At most one season is active at a time
//! - A newly created tree log earns `floor(total_trees / 100)` coins, once
//! - Deleting an hourly entry recomputes the day's total from what remains
//! - Purchased cosmetics are never removed and cannot be bought twice

pub mod cosmetics_service;
pub mod record_store;
pub mod scope;
pub mod scoped_repository;
pub mod season_service;

#[cfg(test)]
pub mod test_utils;

pub use cosmetics_service::CosmeticsStore;
pub use record_store::RecordStore;
pub use scope::{Partition, Scope};
pub use scoped_repository::{SaveOutcome, ScopedRepository};
pub use season_service::{SeasonService, SeasonTransition};
