pub mod memory_store;
pub mod progress;
pub mod sqlite_store;

use chrono::{NaiveDate, NaiveDateTime};

use crate::data::models::{ItemId, LearningItem, ReviewItem, ReviewState, StoreError, Tier, UserId};

pub use memory_store::MemoryStore;
pub use progress::{CatalogRepository, ProgressRepository};
pub use sqlite_store::SqliteStore;

/// Read access to the catalog of reviewable items.
pub trait ItemCatalog: Send + Sync {
    /// Every item, ordered by tier then id.
    fn all_items(&self) -> Result<Vec<LearningItem>, StoreError>;

    fn items_in_tier(&self, tier: Tier) -> Result<Vec<LearningItem>, StoreError>;

    fn find_item(&self, item_id: ItemId) -> Result<Option<LearningItem>, StoreError>;
}

/// Persistence of review states keyed by (user, item).
pub trait ProgressStore: Send + Sync {
    fn load_state(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ReviewState>, StoreError>;

    /// Inserts the row or replaces the existing one for the same pair.
    fn save_state(&self, state: &ReviewState) -> Result<(), StoreError>;

    /// Atomic read-modify-write of one pair: `update` receives the current row
    /// (if any) and its result is persisted before any other writer of the
    /// same pair can read it.
    fn update_state<F>(&self, user_id: UserId, item_id: ItemId, update: F) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(Option<ReviewState>) -> ReviewState;

    /// All rows of a user, ordered by item id.
    fn states_for_user(&self, user_id: UserId) -> Result<Vec<ReviewState>, StoreError>;

    /// Rows with `next_review_at <= now` joined with their catalog item,
    /// optionally restricted to one tier, oldest due first, at most `limit`.
    fn due_items(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<ReviewItem>, StoreError>;

    /// Distinct calendar days of `last_reviewed_at`, most recent first, at most `limit`.
    fn recent_review_dates(&self, user_id: UserId, limit: i64) -> Result<Vec<NaiveDate>, StoreError>;
}
