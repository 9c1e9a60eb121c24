pub mod error_models;
pub mod review_models;
pub mod stats_models;

pub use error_models::{ConfigError, EngineError, StoreError};
pub use review_models::{
    ItemId, LearningItem, LearningStage, ReviewItem, ReviewState, ReviewSubmission, Tier,
    UserId,
};
pub use stats_models::{AggregateStats, TierStats};
