use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::schema::{review_states, vocabulary};

pub type UserId = i32;
pub type ItemId = i32;
/// Grouping key of a catalog item (the HSK level in the host application).
pub type Tier = i32;

/// A reviewable entry of the external catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = vocabulary)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LearningItem {
    pub item_id: ItemId,
    pub tier: Tier,
}

impl LearningItem {
    pub fn new(item_id: ItemId, tier: Tier) -> Self {
        Self { item_id, tier }
    }
}

/// Scheduling state of one (user, item) pair.
///
/// A row only exists once the pair has been reviewed at least once; an
/// unseen item is represented by the absence of a row, never by a default one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = review_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewState {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub repetitions: i32,
    pub next_review_at: NaiveDateTime,
    pub times_seen: i32,
    pub times_correct: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_quality: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<NaiveDateTime>,
}

impl ReviewState {
    /// Priors used for a pair that has never been reviewed.
    pub fn fresh(user_id: UserId, item_id: ItemId, initial_ease: f64, now: NaiveDateTime) -> Self {
        Self {
            user_id,
            item_id,
            ease_factor: initial_ease,
            interval_days: 0,
            repetitions: 0,
            next_review_at: now,
            times_seen: 0,
            times_correct: 0,
            last_quality: None,
            last_reviewed_at: None,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_review_at <= now
    }

    pub fn is_mastered(&self, threshold: i32) -> bool {
        self.repetitions >= threshold
    }

    pub fn stage(&self) -> LearningStage {
        match self.repetitions {
            0 => LearningStage::Learning,
            1 => LearningStage::Recognized,
            _ => LearningStage::Retained,
        }
    }
}

/// Coarse position of a pair in the review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStage {
    New,
    Learning,
    Recognized,
    Retained,
}

impl LearningStage {
    pub fn of(state: Option<&ReviewState>) -> Self {
        state.map_or(LearningStage::New, ReviewState::stage)
    }
}

/// Catalog item joined with the user's progress on it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    #[serde(flatten)]
    pub item: LearningItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ReviewState>,
}

/// One answer of a review session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub item_id: ItemId,
    pub quality: i32,
}

impl ReviewSubmission {
    pub fn new(item_id: ItemId, quality: i32) -> Self {
        Self { item_id, quality }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_learning_stage() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut state = ReviewState::fresh(1, 1, 2.5, now);
        assert_eq!(LearningStage::of(None), LearningStage::New);
        assert_eq!(LearningStage::of(Some(&state)), LearningStage::Learning);

        state.repetitions = 1;
        assert_eq!(state.stage(), LearningStage::Recognized);
        state.repetitions = 4;
        assert_eq!(state.stage(), LearningStage::Retained);
        assert!(!state.is_mastered(5));
    }

    #[test]
    fn test_unseen_item_serializes_without_progress() {
        let item = ReviewItem {
            item: LearningItem::new(12, 3),
            progress: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({ "item_id": 12, "tier": 3 }));
    }
}
