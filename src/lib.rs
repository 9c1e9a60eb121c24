//! Spaced repetition scheduling for vocabulary review.
//!
//! [`Sm2Scheduler`] computes the next interval of a single item;
//! [`Coordinator`] loads and persists per (user, item) state through the
//! [`ProgressStore`] and [`ItemCatalog`] traits and answers the due, unseen
//! and statistics queries.

pub mod config;
pub mod data;
pub mod features;
pub mod schema;
pub mod utils;

pub use config::{DatabaseConfig, EngineConfig};
pub use data::models::{
    AggregateStats, ConfigError, EngineError, ItemId, LearningItem, LearningStage, ReviewItem,
    ReviewState, ReviewSubmission, StoreError, Tier, TierStats, UserId,
};
pub use data::repositories::{ItemCatalog, MemoryStore, ProgressStore, SqliteStore};
pub use features::srs::{
    BatchOutcome, BatchReport, Coordinator, FailedReview, Quality, ScheduleUpdate,
    SchedulerConfig, Sm2Scheduler,
};
pub use utils::{Clock, FixedClock, SystemClock};
