pub mod coordinator;
pub mod error_conversions;
pub mod scheduler;
pub mod stats;

pub use coordinator::{BatchOutcome, BatchReport, Coordinator, FailedReview};
pub use scheduler::{Quality, ScheduleUpdate, SchedulerConfig, Sm2Scheduler};
