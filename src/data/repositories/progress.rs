use chrono::{NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use diesel::upsert::excluded;

use crate::data::models::{ItemId, LearningItem, ReviewState, StoreError, Tier, UserId};
use crate::schema::{review_states, vocabulary};

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS vocabulary (
        item_id INTEGER PRIMARY KEY NOT NULL,
        tier INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_vocabulary_tier ON vocabulary (tier);
    CREATE TABLE IF NOT EXISTS review_states (
        user_id INTEGER NOT NULL,
        item_id INTEGER NOT NULL,
        ease_factor DOUBLE NOT NULL DEFAULT 2.5,
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        next_review_at TIMESTAMP NOT NULL,
        times_seen INTEGER NOT NULL DEFAULT 0,
        times_correct INTEGER NOT NULL DEFAULT 0,
        last_quality INTEGER,
        last_reviewed_at TIMESTAMP,
        PRIMARY KEY (user_id, item_id)
    );
    CREATE INDEX IF NOT EXISTS idx_review_states_due ON review_states (user_id, next_review_at);
";

#[derive(QueryableByName)]
struct ReviewDay {
    #[diesel(sql_type = Text)]
    review_day: String,
}

pub struct ProgressRepository;

impl ProgressRepository {
    pub fn create_tables(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
        conn.batch_execute(CREATE_TABLES)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        user: UserId,
        item: ItemId,
    ) -> Result<Option<ReviewState>, diesel::result::Error> {
        review_states::table
            .filter(review_states::user_id.eq(user))
            .filter(review_states::item_id.eq(item))
            .select(ReviewState::as_select())
            .first(conn)
            .optional()
    }

    pub fn upsert(
        conn: &mut SqliteConnection,
        state: &ReviewState,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(review_states::table)
            .values(state)
            .on_conflict((review_states::user_id, review_states::item_id))
            .do_update()
            .set((
                review_states::ease_factor.eq(excluded(review_states::ease_factor)),
                review_states::interval_days.eq(excluded(review_states::interval_days)),
                review_states::repetitions.eq(excluded(review_states::repetitions)),
                review_states::next_review_at.eq(excluded(review_states::next_review_at)),
                review_states::times_seen.eq(excluded(review_states::times_seen)),
                review_states::times_correct.eq(excluded(review_states::times_correct)),
                review_states::last_quality.eq(excluded(review_states::last_quality)),
                review_states::last_reviewed_at.eq(excluded(review_states::last_reviewed_at)),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn for_user(
        conn: &mut SqliteConnection,
        user: UserId,
    ) -> Result<Vec<ReviewState>, diesel::result::Error> {
        review_states::table
            .filter(review_states::user_id.eq(user))
            .order_by(review_states::item_id.asc())
            .select(ReviewState::as_select())
            .load(conn)
    }

    pub fn due(
        conn: &mut SqliteConnection,
        user: UserId,
        now: NaiveDateTime,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<(LearningItem, ReviewState)>, diesel::result::Error> {
        let mut query = review_states::table
            .inner_join(vocabulary::table)
            .filter(review_states::user_id.eq(user))
            .filter(review_states::next_review_at.le(now))
            .select((LearningItem::as_select(), ReviewState::as_select()))
            .into_boxed();

        if let Some(tier) = tier {
            query = query.filter(vocabulary::tier.eq(tier));
        }

        query
            .order_by((review_states::next_review_at.asc(), review_states::item_id.asc()))
            .limit(limit)
            .load(conn)
    }

    pub fn recent_review_dates(
        conn: &mut SqliteConnection,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let days = diesel::sql_query(
            "SELECT DISTINCT DATE(last_reviewed_at) AS review_day
             FROM review_states
             WHERE user_id = ? AND last_reviewed_at IS NOT NULL
             ORDER BY review_day DESC
             LIMIT ?",
        )
        .bind::<Integer, _>(user)
        .bind::<BigInt, _>(limit)
        .load::<ReviewDay>(conn)?;

        days.into_iter()
            .map(|row| {
                NaiveDate::parse_from_str(&row.review_day, "%Y-%m-%d").map_err(|e| {
                    StoreError::CorruptRow(format!("review day {:?}: {}", row.review_day, e))
                })
            })
            .collect()
    }
}

pub struct CatalogRepository;

impl CatalogRepository {
    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<LearningItem>, diesel::result::Error> {
        vocabulary::table
            .order_by((vocabulary::tier.asc(), vocabulary::item_id.asc()))
            .select(LearningItem::as_select())
            .load(conn)
    }

    pub fn in_tier(
        conn: &mut SqliteConnection,
        tier: Tier,
    ) -> Result<Vec<LearningItem>, diesel::result::Error> {
        vocabulary::table
            .filter(vocabulary::tier.eq(tier))
            .order_by(vocabulary::item_id.asc())
            .select(LearningItem::as_select())
            .load(conn)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        item: ItemId,
    ) -> Result<Option<LearningItem>, diesel::result::Error> {
        vocabulary::table
            .filter(vocabulary::item_id.eq(item))
            .select(LearningItem::as_select())
            .first(conn)
            .optional()
    }

    pub fn upsert(
        conn: &mut SqliteConnection,
        item: &LearningItem,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(vocabulary::table)
            .values(item)
            .on_conflict(vocabulary::item_id)
            .do_update()
            .set(vocabulary::tier.eq(item.tier))
            .execute(conn)?;
        Ok(())
    }
}
