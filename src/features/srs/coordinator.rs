use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::data::models::{
    AggregateStats, EngineError, ItemId, LearningItem, ReviewItem, ReviewState, ReviewSubmission,
    StoreError, Tier, UserId,
};
use crate::data::repositories::{ItemCatalog, ProgressStore};
use crate::features::srs::scheduler::{Quality, Sm2Scheduler};
use crate::features::srs::stats;
use crate::utils::{Clock, SystemClock};

/// Result of one pair of a batch submission
#[derive(Debug)]
pub struct BatchOutcome {
    pub item_id: ItemId,
    pub result: Result<ReviewState, EngineError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Serializable summary of a batch for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub results: Vec<ReviewState>,
    pub failed: Vec<FailedReview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedReview {
    pub item_id: ItemId,
    pub error: String,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<BatchOutcome>) -> Self {
        let mut results = Vec::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(state) => results.push(state),
                Err(e) => failed.push(FailedReview {
                    item_id: outcome.item_id,
                    error: e.to_string(),
                }),
            }
        }
        Self {
            processed: results.len(),
            results,
            failed,
        }
    }
}

/// Bridges the SM-2 scheduler to persisted review states.
///
/// `submit_review` is the only operation that writes. Its read-modify-write
/// goes through `ProgressStore::update_state`, so two coordinators sharing a
/// store still serialize on the same pair. Batches are not atomic: every pair is its own unit of work and a
/// failed pair leaves the others committed.
pub struct Coordinator<S, C> {
    store: Arc<S>,
    catalog: Arc<C>,
    scheduler: Sm2Scheduler,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl<S: ProgressStore, C: ItemCatalog> Coordinator<S, C> {
    pub fn new(store: Arc<S>, catalog: Arc<C>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            scheduler: Sm2Scheduler::new(config.scheduler),
            config,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Makes the within-tier order of unseen items reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Items whose review is due, oldest due first.
    pub fn get_due_items(
        &self,
        user_id: UserId,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<ReviewItem>, EngineError> {
        let limit = self
            .config
            .normalize_limit(limit, self.config.default_due_limit);
        let now = self.clock.now();

        self.store
            .due_items(user_id, now, tier, limit as i64)
            .inspect_err(|e| log::error!("Failed to load due reviews for user {}: {}", user_id, e))
            .map_err(EngineError::from)
    }

    /// Items the user has never reviewed, lowest tier first and shuffled
    /// within a tier.
    pub fn get_unseen_items(
        &self,
        user_id: UserId,
        tier: Option<Tier>,
        limit: i64,
    ) -> Result<Vec<ReviewItem>, EngineError> {
        let limit = self
            .config
            .normalize_limit(limit, self.config.default_new_limit);

        let seen: HashSet<ItemId> = self
            .store
            .states_for_user(user_id)
            .inspect_err(|e| log::error!("Failed to load progress for user {}: {}", user_id, e))?
            .into_iter()
            .map(|state| state.item_id)
            .collect();

        let mut by_tier: BTreeMap<Tier, Vec<LearningItem>> = BTreeMap::new();
        for item in self.catalog_slice(tier)? {
            if !seen.contains(&item.item_id) {
                by_tier.entry(item.tier).or_default().push(item);
            }
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut picked = Vec::with_capacity(limit);
        for mut items in by_tier.into_values() {
            if picked.len() >= limit {
                break;
            }
            items.shuffle(&mut *rng);
            picked.extend(items.into_iter().take(limit - picked.len()));
        }

        Ok(picked
            .into_iter()
            .map(|item| ReviewItem {
                item,
                progress: None,
            })
            .collect())
    }

    /// Applies one review and returns the persisted state. The first review
    /// of a pair creates its row.
    pub fn submit_review(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quality: i32,
    ) -> Result<ReviewState, EngineError> {
        if self.catalog.find_item(item_id)?.is_none() {
            log::warn!("Review submitted for unknown item {} by user {}", item_id, user_id);
            return Err(EngineError::ItemNotFound(item_id));
        }

        self.apply_review(user_id, item_id, quality)
            .inspect_err(|e| {
                log::error!(
                    "Failed to save review of item {} for user {}: {}",
                    item_id,
                    user_id,
                    e
                )
            })
            .map_err(EngineError::from)
    }

    fn apply_review(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quality: i32,
    ) -> Result<ReviewState, StoreError> {
        let now = self.clock.now();
        let quality = Quality::from_score(quality);
        let initial_ease = self.config.scheduler.initial_ease;

        let state = self.store.update_state(user_id, item_id, |prior| {
            let prior =
                prior.unwrap_or_else(|| ReviewState::fresh(user_id, item_id, initial_ease, now));
            let update = self.scheduler.compute(
                prior.ease_factor,
                prior.interval_days,
                prior.repetitions,
                quality.score(),
                now,
            );

            ReviewState {
                ease_factor: update.ease_factor,
                interval_days: update.interval_days,
                repetitions: update.repetitions,
                next_review_at: update.next_review_at,
                times_seen: prior.times_seen.saturating_add(1),
                times_correct: if quality.is_correct() {
                    prior.times_correct.saturating_add(1)
                } else {
                    prior.times_correct
                },
                last_quality: Some(quality.score()),
                last_reviewed_at: Some(now),
                ..prior
            }
        })?;

        log::debug!(
            "User {} reviewed item {} (q={}): interval {}d, ease {:.2}, reps {}",
            user_id,
            item_id,
            quality.score(),
            state.interval_days,
            state.ease_factor,
            state.repetitions
        );
        Ok(state)
    }

    /// Applies every submission independently, in order. One outcome per
    /// submission; a failure never rolls back or skips its siblings.
    pub fn submit_review_batch(
        &self,
        user_id: UserId,
        submissions: &[ReviewSubmission],
    ) -> Vec<BatchOutcome> {
        let outcomes: Vec<_> = submissions
            .iter()
            .map(|submission| BatchOutcome {
                item_id: submission.item_id,
                result: self.submit_review(user_id, submission.item_id, submission.quality),
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        if failed > 0 {
            log::warn!(
                "{} of {} reviews failed for user {}",
                failed,
                outcomes.len(),
                user_id
            );
        }
        outcomes
    }

    pub fn get_stats(&self, user_id: UserId) -> Result<AggregateStats, EngineError> {
        let now = self.clock.now();
        let states = self
            .store
            .states_for_user(user_id)
            .inspect_err(|e| log::error!("Failed to load progress for user {}: {}", user_id, e))?;
        let catalog = self.catalog.all_items()?;
        let review_days = self
            .store
            .recent_review_dates(user_id, self.config.streak_lookback)?;

        Ok(stats::summarize(
            &states,
            &catalog,
            &review_days,
            now,
            self.config.mastery_threshold,
        ))
    }

    fn catalog_slice(&self, tier: Option<Tier>) -> Result<Vec<LearningItem>, StoreError> {
        match tier {
            Some(tier) => self.catalog.items_in_tier(tier),
            None => self.catalog.all_items(),
        }
    }
}
