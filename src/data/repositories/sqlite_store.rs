use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;

use super::progress::{CatalogRepository, ProgressRepository};
use super::{ItemCatalog, ProgressStore};
use crate::data::models::{ItemId, LearningItem, ReviewItem, ReviewState, StoreError, Tier, UserId};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Diesel backed store over the `vocabulary` and `review_states` tables.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Opens a pool on `database_url`; a leading `sqlite://` is accepted.
    pub fn open(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let path = database_url.trim_start_matches("sqlite://");
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: BUSY_TIMEOUT,
            }))
            .build(ConnectionManager::<SqliteConnection>::new(path))?;

        let store = Self { pool };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Private in-memory database. Every SQLite `:memory:` connection is its
    /// own database, so the pool holds exactly one connection and never
    /// recycles it.
    pub fn in_memory() -> Result<Self, StoreError> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: BUSY_TIMEOUT,
            }))
            .build(ConnectionManager::<SqliteConnection>::new(":memory:"))?;

        let store = Self { pool };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        ProgressRepository::create_tables(&mut conn)?;
        Ok(())
    }

    /// Loads catalog entries, replacing the tier of items already present.
    pub fn insert_items(&self, items: &[LearningItem]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            for item in items {
                CatalogRepository::upsert(conn, item)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn conn(&self) -> Result<DbConn, StoreError> {
        self.pool.get().map_err(|e| {
            log::error!("Failed to get database connection: {}", e);
            StoreError::Unavailable(e.to_string())
        })
    }
}

impl ItemCatalog for SqliteStore {
    fn all_items(&self) -> Result<Vec<LearningItem>, StoreError> {
        let mut conn = self.conn()?;
        Ok(CatalogRepository::all(&mut conn)?)
    }

    fn items_in_tier(&self, tier: Tier) -> Result<Vec<LearningItem>, StoreError> {
        let mut conn = self.conn()?;
        Ok(CatalogRepository::in_tier(&mut conn, tier)?)
    }

    fn find_item(&self, item_id: ItemId) -> Result<Option<LearningItem>, StoreError> {
        let mut conn = self.conn()?;
        Ok(CatalogRepository::find(&mut conn, item_id)?)
    }
}

impl ProgressStore for SqliteStore {
    fn load_state(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ReviewState>, StoreError> {
        let mut conn = self.conn()?;
        Ok(ProgressRepository::find(&mut conn, user_id, item_id)?)
    }

    fn save_state(&self, state: &ReviewState) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| ProgressRepository::upsert(conn, state))?;
        Ok(())
    }

    // BEGIN IMMEDIATE takes the write lock before the read, so writers on
    // other connections or processes wait on the busy timeout.
    fn update_state<F>(&self, user_id: UserId, item_id: ItemId, update: F) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(Option<ReviewState>) -> ReviewState,
    {
        let mut conn = self.conn()?;
        let state = conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            let prior = ProgressRepository::find(conn, user_id, item_id)?;
            let state = update(prior);
            ProgressRepository::upsert(conn, &state)?;
            Ok(state)
        })?;
        Ok(state)
    }

    fn states_for_user(&self, user_id: UserId) -> Result<Vec<ReviewState>, StoreError> {
        let mut conn = self.conn()?;
        Ok(ProgressRepository::for_user(&mut conn, user_id)?)
    }

    fn due_items(
        &self,
        user_id: UserId,
        now: NaiveDateTime,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        let mut conn = self.conn()?;
        Ok(ProgressRepository::due(&mut conn, user_id, now, tier, limit)?
            .into_iter()
            .map(|(item, state)| ReviewItem {
                item,
                progress: Some(state),
            })
            .collect())
    }

    fn recent_review_dates(&self, user_id: UserId, limit: i64) -> Result<Vec<NaiveDate>, StoreError> {
        let mut conn = self.conn()?;
        ProgressRepository::recent_review_dates(&mut conn, user_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as Days;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn state(user: UserId, item: ItemId, next: NaiveDateTime, reviewed: NaiveDateTime) -> ReviewState {
        ReviewState {
            next_review_at: next,
            times_seen: 1,
            times_correct: 1,
            last_quality: Some(4),
            last_reviewed_at: Some(reviewed),
            ..ReviewState::fresh(user, item, 2.5, reviewed)
        }
    }

    #[test]
    fn test_catalog_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_items(&[LearningItem::new(3, 2), LearningItem::new(1, 1), LearningItem::new(2, 2)])
            .unwrap();

        let all = store.all_items().unwrap();
        assert_eq!(all.iter().map(|i| i.item_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(store.items_in_tier(2).unwrap().len(), 2);
        assert_eq!(store.find_item(3).unwrap(), Some(LearningItem::new(3, 2)));
        assert_eq!(store.find_item(99).unwrap(), None);

        store.insert_items(&[LearningItem::new(3, 4)]).unwrap();
        assert_eq!(store.find_item(3).unwrap(), Some(LearningItem::new(3, 4)));
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_items(&[LearningItem::new(1, 1)]).unwrap();

        let first = state(7, 1, at(2, 9), at(1, 9));
        store.save_state(&first).unwrap();
        assert_eq!(store.load_state(7, 1).unwrap(), Some(first.clone()));

        let second = ReviewState {
            times_seen: 2,
            repetitions: 1,
            ..first
        };
        store.save_state(&second).unwrap();
        assert_eq!(store.load_state(7, 1).unwrap(), Some(second));
        assert_eq!(store.states_for_user(7).unwrap().len(), 1);
        assert_eq!(store.load_state(8, 1).unwrap(), None);
    }

    #[test]
    fn test_due_items_filtered_and_limited_in_query() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_items(&[
                LearningItem::new(1, 1),
                LearningItem::new(2, 1),
                LearningItem::new(3, 1),
                LearningItem::new(4, 2),
            ])
            .unwrap();
        store.save_state(&state(1, 1, at(10, 8), at(9, 8))).unwrap();
        store.save_state(&state(1, 2, at(4, 8), at(3, 8))).unwrap();
        store.save_state(&state(1, 3, at(20, 8), at(19, 8))).unwrap();
        store.save_state(&state(1, 4, at(2, 8), at(1, 8))).unwrap();

        let ids = |items: Vec<ReviewItem>| items.iter().map(|i| i.item.item_id).collect::<Vec<_>>();
        assert_eq!(ids(store.due_items(1, at(10, 8), None, 10).unwrap()), vec![4, 2, 1]);
        assert_eq!(ids(store.due_items(1, at(10, 8), Some(1), 10).unwrap()), vec![2, 1]);
        assert_eq!(ids(store.due_items(1, at(10, 8), None, 2).unwrap()), vec![4, 2]);

        let joined = store.due_items(1, at(10, 8), Some(2), 10).unwrap();
        assert_eq!(joined[0].item, LearningItem::new(4, 2));
        assert_eq!(joined[0].progress.as_ref().unwrap().next_review_at, at(2, 8));
    }

    #[test]
    fn test_update_state_sees_prior_row() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_items(&[LearningItem::new(1, 1)]).unwrap();

        let first = store
            .update_state(3, 1, |prior| {
                assert!(prior.is_none());
                ReviewState { times_seen: 1, ..ReviewState::fresh(3, 1, 2.5, at(1, 8)) }
            })
            .unwrap();
        let second = store
            .update_state(3, 1, |prior| {
                let prior = prior.unwrap();
                ReviewState { times_seen: prior.times_seen + 1, ..prior }
            })
            .unwrap();

        assert_eq!(first.times_seen, 1);
        assert_eq!(second.times_seen, 2);
        assert_eq!(store.load_state(3, 1).unwrap(), Some(second));
    }

    #[test]
    fn test_recent_review_dates_are_distinct_and_capped() {
        let store = SqliteStore::in_memory().unwrap();
        let items: Vec<_> = (1..=5).map(|id| LearningItem::new(id, 1)).collect();
        store.insert_items(&items).unwrap();

        store.save_state(&state(1, 1, at(12, 8), at(11, 8))).unwrap();
        store.save_state(&state(1, 2, at(12, 8), at(11, 21))).unwrap();
        store.save_state(&state(1, 3, at(11, 8), at(10, 8))).unwrap();
        store.save_state(&state(1, 4, at(9, 8), at(8, 8))).unwrap();
        store.save_state(&ReviewState::fresh(1, 5, 2.5, at(1, 0))).unwrap();

        let days = store.recent_review_dates(1, 30).unwrap();
        let expected: Vec<_> = [11, 10, 8]
            .iter()
            .map(|d| NaiveDate::from_ymd_opt(2024, 5, *d).unwrap())
            .collect();
        assert_eq!(days, expected);
        assert_eq!(store.recent_review_dates(1, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("srs.db").display());
        let reviewed = at(3, 12);

        {
            let store = SqliteStore::open(&url, 2).unwrap();
            store.insert_items(&[LearningItem::new(1, 1)]).unwrap();
            store.save_state(&state(5, 1, reviewed + Days::days(1), reviewed)).unwrap();
        }

        let reopened = SqliteStore::open(&url, 2).unwrap();
        let loaded = reopened.load_state(5, 1).unwrap().unwrap();
        assert_eq!(loaded.last_reviewed_at, Some(reviewed));
    }
}
