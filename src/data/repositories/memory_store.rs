use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use super::{ItemCatalog, ProgressStore};
use crate::data::models::{ItemId, LearningItem, ReviewItem, ReviewState, StoreError, Tier, UserId};

/// Process local store, for embedding without a database and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemId, LearningItem>>,
    states: Mutex<BTreeMap<(UserId, ItemId), ReviewState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = LearningItem>) -> Self {
        let store = Self::new();
        store.insert_items(items);
        store
    }

    pub fn insert_items(&self, items: impl IntoIterator<Item = LearningItem>) {
        let mut catalog = self.items.lock().unwrap_or_else(|e| e.into_inner());
        for item in items {
            catalog.insert(item.item_id, item);
        }
    }

    fn user_states(&self, user_id: UserId) -> Result<Vec<ReviewState>, StoreError> {
        let states = self.states.lock()?;
        Ok(states
            .range((user_id, ItemId::MIN)..=(user_id, ItemId::MAX))
            .map(|(_, state)| state.clone())
            .collect())
    }
}

impl ItemCatalog for MemoryStore {
    fn all_items(&self) -> Result<Vec<LearningItem>, StoreError> {
        let mut items: Vec<_> = self.items.lock()?.values().copied().collect();
        items.sort_by_key(|item| (item.tier, item.item_id));
        Ok(items)
    }

    fn items_in_tier(&self, tier: Tier) -> Result<Vec<LearningItem>, StoreError> {
        Ok(self
            .items
            .lock()?
            .values()
            .filter(|item| item.tier == tier)
            .copied()
            .collect())
    }

    fn find_item(&self, item_id: ItemId) -> Result<Option<LearningItem>, StoreError> {
        Ok(self.items.lock()?.get(&item_id).copied())
    }
}

impl ProgressStore for MemoryStore {
    fn load_state(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ReviewState>, StoreError> {
        Ok(self.states.lock()?.get(&(user_id, item_id)).cloned())
    }

    fn save_state(&self, state: &ReviewState) -> Result<(), StoreError> {
        self.states
            .lock()?
            .insert((state.user_id, state.item_id), state.clone());
        Ok(())
    }

    // The states mutex is held across `update`, serializing every writer.
    fn update_state<F>(&self, user_id: UserId, item_id: ItemId, update: F) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(Option<ReviewState>) -> ReviewState,
    {
        let mut states = self.states.lock()?;
        let state = update(states.get(&(user_id, item_id)).cloned());
        states.insert((user_id, item_id), state.clone());
        Ok(state)
    }

    fn states_for_user(&self, user_id: UserId) -> Result<Vec<ReviewState>, StoreError> {
        self.user_states(user_id)
    }

    fn due_items(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        let catalog = self.items.lock()?.clone();
        let mut due: Vec<_> = self
            .user_states(user_id)?
            .into_iter()
            .filter(|state| state.is_due(now))
            .filter_map(|state| {
                let item = *catalog.get(&state.item_id)?;
                tier.is_none_or(|tier| item.tier == tier).then_some(ReviewItem {
                    item,
                    progress: Some(state),
                })
            })
            .collect();
        due.sort_by_key(|row| (row.progress.as_ref().map(|s| s.next_review_at), row.item.item_id));
        due.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(due)
    }

    fn recent_review_dates(&self, user_id: UserId, limit: i64) -> Result<Vec<NaiveDate>, StoreError> {
        let days: BTreeSet<NaiveDate> = self
            .user_states(user_id)?
            .iter()
            .filter_map(|state| state.last_reviewed_at.map(|at| at.date()))
            .collect();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(days.into_iter().rev().take(limit).collect())
    }
}
