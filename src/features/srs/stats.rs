use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::data::models::{AggregateStats, ItemId, LearningItem, ReviewState, Tier, TierStats};
use crate::features::srs::scheduler::DEFAULT_INITIAL_EASE;

/// Number of consecutive days ending today with at least one review.
///
/// `days` must be distinct and sorted most recent first. The walk requires
/// `days[i] == today - i`, so a learner whose last review was yesterday has a
/// streak of 0 until they review again today.
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut streak = 0;
    for (offset, day) in days.iter().enumerate() {
        let expected = i64::try_from(offset)
            .ok()
            .and_then(|offset| today.checked_sub_signed(Duration::days(offset)));
        if Some(*day) != expected {
            break;
        }
        streak += 1;
    }
    streak
}

/// Aggregates a user's review states against the full catalog.
pub fn summarize(
    states: &[ReviewState],
    catalog: &[LearningItem],
    review_days: &[NaiveDate],
    now: NaiveDateTime,
    mastery_threshold: i32,
) -> AggregateStats {
    let total = states.len() as i64;
    let mastered = states.iter().filter(|s| s.is_mastered(mastery_threshold)).count() as i64;
    let due = states.iter().filter(|s| s.is_due(now)).count() as i64;

    let average_ease_factor = if states.is_empty() {
        DEFAULT_INITIAL_EASE
    } else {
        states.iter().map(|s| s.ease_factor).sum::<f64>() / states.len() as f64
    };

    let total_reviews: i64 = states.iter().map(|s| i64::from(s.times_seen)).sum();
    let total_correct: i64 = states.iter().map(|s| i64::from(s.times_correct)).sum();
    let accuracy_rate = if total_reviews > 0 {
        total_correct as f64 / total_reviews as f64 * 100.0
    } else {
        0.0
    };

    AggregateStats {
        total_words_learned: total,
        words_mastered: mastered,
        words_due_for_review: due,
        average_ease_factor,
        current_streak: current_streak(review_days, now.date()),
        total_reviews,
        accuracy_rate,
        words_by_tier: tier_breakdown(states, catalog, now, mastery_threshold),
    }
}

fn tier_breakdown(
    states: &[ReviewState],
    catalog: &[LearningItem],
    now: NaiveDateTime,
    mastery_threshold: i32,
) -> BTreeMap<Tier, TierStats> {
    let mut by_tier: BTreeMap<Tier, TierStats> = BTreeMap::new();
    let mut tier_of: HashMap<ItemId, Tier> = HashMap::with_capacity(catalog.len());
    for item in catalog {
        tier_of.insert(item.item_id, item.tier);
        by_tier.entry(item.tier).or_default().total_words += 1;
    }

    // rows whose item left the catalog only count in the overall totals
    for state in states {
        let Some(tier) = tier_of.get(&state.item_id) else {
            continue;
        };
        let entry = by_tier.entry(*tier).or_default();
        entry.words_learned += 1;
        if state.is_mastered(mastery_threshold) {
            entry.words_mastered += 1;
        }
        if state.is_due(now) {
            entry.words_due += 1;
        }
    }
    by_tier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn state(item: ItemId, reps: i32, ease: f64, seen: i32, correct: i32, next: NaiveDateTime) -> ReviewState {
        ReviewState {
            ease_factor: ease,
            repetitions: reps,
            times_seen: seen,
            times_correct: correct,
            next_review_at: next,
            ..ReviewState::fresh(1, item, 2.5, next)
        }
    }

    #[test]
    fn test_streak_consecutive_days() {
        assert_eq!(current_streak(&[date(15), date(14), date(13)], date(15)), 3);
    }

    #[test]
    fn test_streak_without_review_today_is_zero() {
        assert_eq!(current_streak(&[date(14), date(13)], date(15)), 0);
    }

    #[test]
    fn test_streak_stops_at_first_gap() {
        assert_eq!(current_streak(&[date(15), date(14), date(12), date(11)], date(15)), 2);
        assert_eq!(current_streak(&[], date(15)), 0);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let days = [date(2), date(1), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()];
        assert_eq!(current_streak(&days, date(2)), 3);
    }

    #[test]
    fn test_empty_summary_defaults() {
        let now = date(10).and_hms_opt(9, 0, 0).unwrap();
        let stats = summarize(&[], &[LearningItem::new(1, 1)], &[], now, 5);

        assert_eq!(stats.total_words_learned, 0);
        assert_eq!(stats.average_ease_factor, 2.5);
        assert_eq!(stats.accuracy_rate, 0.0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.words_by_tier[&1], TierStats { total_words: 1, ..TierStats::default() });
    }

    #[test]
    fn test_summary_counts() {
        let now = date(10).and_hms_opt(9, 0, 0).unwrap();
        let past = now - Duration::days(1);
        let future = now + Duration::days(3);
        let catalog = [
            LearningItem::new(1, 1),
            LearningItem::new(2, 1),
            LearningItem::new(3, 2),
            LearningItem::new(4, 3),
        ];
        let states = [
            state(1, 5, 2.8, 6, 6, future),
            state(2, 0, 1.8, 3, 1, past),
            state(3, 2, 2.2, 3, 2, now),
            state(99, 6, 2.4, 8, 7, past),
        ];

        let stats = summarize(&states, &catalog, &[date(10)], now, 5);
        assert_eq!(stats.total_words_learned, 4);
        assert_eq!(stats.words_mastered, 2);
        assert_eq!(stats.words_due_for_review, 3);
        assert!((stats.average_ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(stats.total_reviews, 20);
        assert!((stats.accuracy_rate - 80.0).abs() < 1e-9);
        assert_eq!(stats.current_streak, 1);

        assert_eq!(
            stats.words_by_tier[&1],
            TierStats { total_words: 2, words_learned: 2, words_mastered: 1, words_due: 1 }
        );
        assert_eq!(
            stats.words_by_tier[&2],
            TierStats { total_words: 1, words_learned: 1, words_mastered: 0, words_due: 1 }
        );
        assert_eq!(stats.words_by_tier[&3], TierStats { total_words: 1, ..TierStats::default() });
        assert_eq!(stats.words_by_tier.len(), 3);
    }
}
