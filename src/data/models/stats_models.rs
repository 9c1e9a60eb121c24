use std::collections::BTreeMap;

use serde::Serialize;

use super::Tier;

/// Read-side projection over all review states of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_words_learned: i64,
    pub words_mastered: i64,
    pub words_due_for_review: i64,
    pub average_ease_factor: f64,
    pub current_streak: u32,
    pub total_reviews: i64,
    pub accuracy_rate: f64,
    pub words_by_tier: BTreeMap<Tier, TierStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub total_words: i64,
    pub words_learned: i64,
    pub words_mastered: i64,
    pub words_due: i64,
}
