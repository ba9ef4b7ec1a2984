//! One-time-per-day action flags
//!
//! Faction manipulation and faction fights may each be used once per game
//! day. The flags are kept locally, keyed by user and day count, so a new
//! day starts clean without any explicit reset.

use crate::error::Result;
use crate::storage::{keys, store_get_json, store_set_json, BoxedStateStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Flags for one user on one game day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActionFlags {
    /// Faction manipulation already used today
    pub used_manipulation: bool,
    /// Faction fight already used today
    pub used_fight: bool,
}

/// Daily flag persistence
#[derive(Clone)]
pub struct DailyFlagStore {
    store: BoxedStateStore,
}

impl DailyFlagStore {
    /// Wrap a state store
    pub fn new(store: BoxedStateStore) -> Self {
        Self { store }
    }

    /// Flags for a user and day; a day never seen is all-false
    pub async fn load(&self, user_id: u64, day_count: u32) -> Result<DailyActionFlags> {
        let key = keys::daily(user_id, day_count);
        Ok(store_get_json(self.store.as_ref(), &key)
            .await?
            .unwrap_or_default())
    }

    /// Record that manipulation was used
    pub async fn mark_manipulation(&self, user_id: u64, day_count: u32) -> Result<DailyActionFlags> {
        self.update(user_id, day_count, |flags| flags.used_manipulation = true)
            .await
    }

    /// Record that a fight was used
    pub async fn mark_fight(&self, user_id: u64, day_count: u32) -> Result<DailyActionFlags> {
        self.update(user_id, day_count, |flags| flags.used_fight = true)
            .await
    }

    /// Debug reset: clear both flags for the day
    pub async fn reset(&self, user_id: u64, day_count: u32) -> Result<()> {
        self.store.delete(&keys::daily(user_id, day_count)).await?;
        self.store.flush().await?;
        info!(user_id, day_count, "Daily action flags reset");
        Ok(())
    }

    async fn update(
        &self,
        user_id: u64,
        day_count: u32,
        apply: impl FnOnce(&mut DailyActionFlags),
    ) -> Result<DailyActionFlags> {
        let mut flags = self.load(user_id, day_count).await?;
        apply(&mut flags);
        store_set_json(self.store.as_ref(), &keys::daily(user_id, day_count), &flags).await?;
        Ok(flags)
    }
}
