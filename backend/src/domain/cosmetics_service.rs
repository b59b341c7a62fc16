//! Coin balance and cosmetic inventory.
//!
//! The whole inventory is one record under `@user_cosmetics`. Every
//! read-modify-write runs while holding `write_lock`, and clones of the
//! service share that lock, so a purchase racing a coin credit cannot drop
//! either update.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared::{CosmeticSlot, UserCosmetics};

use crate::storage::{get_json, keys, set_json, KeyValueStore, StorageResult};

#[derive(Clone)]
pub struct CosmeticsStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl CosmeticsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stored record, or a zeroed one when nothing has been stored yet
    pub async fn get_user_cosmetics(&self) -> StorageResult<UserCosmetics> {
        Ok(get_json(self.store.as_ref(), keys::USER_COSMETICS)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, cosmetics: &UserCosmetics) -> StorageResult<()> {
        set_json(self.store.as_ref(), keys::USER_COSMETICS, cosmetics).await
    }

    /// Credit coins; returns the new balance
    pub async fn add_coins(&self, amount: u64) -> StorageResult<u64> {
        let _guard = self.write_lock.lock().await;
        let mut cosmetics = self.get_user_cosmetics().await?;
        cosmetics.coins = cosmetics.coins.saturating_add(amount);
        self.save(&cosmetics).await?;
        info!("Added {} coins, balance is now {}", amount, cosmetics.coins);
        Ok(cosmetics.coins)
    }

    /// Buy an item. Returns `false` without changing anything when the item
    /// is already owned or the balance does not cover the price.
    pub async fn purchase_item(&self, item_id: &str, price: u64) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut cosmetics = self.get_user_cosmetics().await?;

        if cosmetics.owns(item_id) {
            warn!("Purchase rejected: {} is already owned", item_id);
            return Ok(false);
        }
        if cosmetics.coins < price {
            warn!(
                "Purchase rejected: {} costs {} but balance is {}",
                item_id, price, cosmetics.coins
            );
            return Ok(false);
        }

        cosmetics.coins -= price;
        cosmetics.purchased_items.push(item_id.to_string());
        self.save(&cosmetics).await?;
        info!("Purchased {} for {} coins", item_id, price);
        Ok(true)
    }

    /// Equip an item in a slot. Ownership is the caller's responsibility.
    pub async fn equip_item(&self, slot: CosmeticSlot, item_id: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut cosmetics = self.get_user_cosmetics().await?;
        *cosmetics.slot_mut(slot) = Some(item_id.to_string());
        self.save(&cosmetics).await?;
        debug!("Equipped {} in {:?}", item_id, slot);
        Ok(())
    }

    pub async fn unequip_item(&self, slot: CosmeticSlot) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut cosmetics = self.get_user_cosmetics().await?;
        *cosmetics.slot_mut(slot) = None;
        self.save(&cosmetics).await?;
        debug!("Cleared {:?}", slot);
        Ok(())
    }
}
