//! SM-2 interval and ease update.
//!
//! Quality is a 0-5 self rating. Ratings of 3 and above count as a successful
//! recall and grow the interval (1 day, then 6 days, then the previous interval
//! times the ease factor). Lower ratings send the item back to a one day
//! interval. The ease factor is recalculated on every review, failures included.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_EASE: f64 = 2.5;
pub const DEFAULT_MIN_EASE: f64 = 1.3;
pub const MIN_INTERVAL_DAYS: i32 = 1;
pub const PASSING_QUALITY: i32 = 3;
pub const MAX_QUALITY: i32 = 5;

/// Recall quality as rated by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Complete blackout, no recognition
    Blackout = 0,
    /// Incorrect, but remembered once the answer was shown
    Incorrect = 1,
    /// Incorrect, but the answer seemed easy to recall
    NearMiss = 2,
    /// Correct with serious difficulty
    Difficult = 3,
    /// Correct after hesitation
    Hesitant = 4,
    /// Perfect, instant recall
    Perfect = 5,
}

impl Quality {
    /// Out of range scores are clamped, never rejected. Callers wanting a
    /// strict 0-5 contract must validate before reaching the engine.
    pub fn from_score(score: i32) -> Self {
        match score.clamp(0, MAX_QUALITY) {
            0 => Quality::Blackout,
            1 => Quality::Incorrect,
            2 => Quality::NearMiss,
            3 => Quality::Difficult,
            4 => Quality::Hesitant,
            _ => Quality::Perfect,
        }
    }

    pub fn score(self) -> i32 {
        self as i32
    }

    pub fn is_correct(self) -> bool {
        self.score() >= PASSING_QUALITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub min_ease: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_INITIAL_EASE,
            min_ease: DEFAULT_MIN_EASE,
        }
    }
}

/// Output of a single SM-2 step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleUpdate {
    pub ease_factor: f64,
    pub interval_days: i32,
    pub repetitions: i32,
    pub next_review_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2Scheduler {
    config: SchedulerConfig,
}

impl Sm2Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn compute(
        &self,
        prior_ease: f64,
        prior_interval_days: i32,
        prior_repetitions: i32,
        quality: i32,
        now: NaiveDateTime,
    ) -> ScheduleUpdate {
        let quality = Quality::from_score(quality);

        let (interval_days, repetitions) = if quality.is_correct() {
            let interval = match prior_repetitions {
                0 => 1,
                1 => 6,
                _ => (f64::from(prior_interval_days) * prior_ease).round() as i32,
            };
            (interval, prior_repetitions.saturating_add(1))
        } else {
            (1, 0)
        };

        let lapse = f64::from(MAX_QUALITY - quality.score());
        let ease = prior_ease + (0.1 - lapse * (0.08 + lapse * 0.02));
        let ease_factor = round_hundredths(ease.max(self.config.min_ease));

        let interval_days = interval_days.max(MIN_INTERVAL_DAYS);

        ScheduleUpdate {
            ease_factor,
            interval_days,
            repetitions,
            next_review_at: add_days(now, interval_days),
        }
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn add_days(at: NaiveDateTime, days: i32) -> NaiveDateTime {
    at.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDateTime::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn step(ease: f64, interval: i32, reps: i32, quality: i32) -> ScheduleUpdate {
        Sm2Scheduler::default().compute(ease, interval, reps, quality, noon())
    }

    #[test]
    fn test_first_review_values() {
        let perfect = step(2.5, 0, 0, 5);
        assert_eq!((perfect.ease_factor, perfect.interval_days, perfect.repetitions), (2.6, 1, 1));

        let hesitant = step(2.5, 0, 0, 4);
        assert_eq!((hesitant.ease_factor, hesitant.interval_days, hesitant.repetitions), (2.5, 1, 1));

        let difficult = step(2.5, 0, 0, 3);
        assert_eq!((difficult.ease_factor, difficult.interval_days, difficult.repetitions), (2.36, 1, 1));

        let blackout = step(2.5, 0, 0, 0);
        assert_eq!((blackout.ease_factor, blackout.interval_days, blackout.repetitions), (1.7, 1, 0));
    }

    #[test]
    fn test_second_success_uses_fixed_six_days() {
        let next = step(2.5, 6, 1, 4);
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.repetitions, 2);
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn test_geometric_growth() {
        let next = step(2.0, 10, 3, 5);
        assert_eq!(next.interval_days, 20);
        assert_eq!(next.repetitions, 4);
        assert_eq!(next.ease_factor, 2.1);
    }

    #[test]
    fn test_failure_resets_but_still_adjusts_ease() {
        let next = step(2.5, 40, 7, 2);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.ease_factor, 2.18);
    }

    #[test]
    fn test_ease_floor() {
        let next = step(1.3, 1, 1, 0);
        assert_eq!(next.ease_factor, 1.3);

        let floored = Sm2Scheduler::new(SchedulerConfig { initial_ease: 2.5, min_ease: 1.5 })
            .compute(1.6, 1, 0, 0, noon());
        assert_eq!(floored.ease_factor, 1.5);
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(step(2.5, 0, 0, 9), step(2.5, 0, 0, 5));
        assert_eq!(step(2.5, 0, 0, -4), step(2.5, 0, 0, 0));
    }

    #[test]
    fn test_bad_priors_never_yield_zero_interval() {
        let next = step(2.5, -10, 4, 5);
        assert_eq!(next.interval_days, 1);

        let next = step(2.5, 0, 2, 4);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_next_review_is_interval_days_later() {
        let next = step(2.5, 6, 1, 5);
        assert_eq!(next.next_review_at, noon() + Duration::days(6));
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(Quality::from_score(3), Quality::Difficult);
        assert!(Quality::Difficult.is_correct());
        assert!(!Quality::NearMiss.is_correct());
        assert_eq!(Quality::from_score(42).score(), 5);
    }
}
