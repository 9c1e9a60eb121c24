use std::env;
use std::str::FromStr;

use crate::data::models::ConfigError;
use crate::features::srs::scheduler::{DEFAULT_INITIAL_EASE, DEFAULT_MIN_EASE, SchedulerConfig};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://site.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Consecutive successful reviews after which an item counts as mastered.
pub const DEFAULT_MASTERY_THRESHOLD: i32 = 5;
/// Distinct review days inspected when computing the streak.
pub const DEFAULT_STREAK_LOOKBACK: i64 = 30;
pub const DEFAULT_DUE_LIMIT: i64 = 20;
pub const DEFAULT_NEW_LIMIT: i64 = 10;
pub const DEFAULT_MAX_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub mastery_threshold: i32,
    pub streak_lookback: i64,
    pub default_due_limit: i64,
    pub default_new_limit: i64,
    pub max_limit: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            streak_lookback: DEFAULT_STREAK_LOOKBACK,
            default_due_limit: DEFAULT_DUE_LIMIT,
            default_new_limit: DEFAULT_NEW_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Reads `SRS_*` overrides from the environment, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            scheduler: SchedulerConfig {
                initial_ease: env_or("SRS_INITIAL_EASE", DEFAULT_INITIAL_EASE)?,
                min_ease: env_or("SRS_MIN_EASE", DEFAULT_MIN_EASE)?,
            },
            mastery_threshold: env_or("SRS_MASTERY_THRESHOLD", DEFAULT_MASTERY_THRESHOLD)?,
            streak_lookback: env_or("SRS_STREAK_LOOKBACK", DEFAULT_STREAK_LOOKBACK)?,
            default_due_limit: env_or("SRS_DEFAULT_DUE_LIMIT", DEFAULT_DUE_LIMIT)?,
            default_new_limit: env_or("SRS_DEFAULT_NEW_LIMIT", DEFAULT_NEW_LIMIT)?,
            max_limit: env_or("SRS_MAX_LIMIT", DEFAULT_MAX_LIMIT)?,
        })
    }

    /// Maps a caller supplied page size onto `1..=max_limit`. Out of range
    /// values fall back to `default` instead of failing.
    pub fn normalize_limit(&self, requested: i64, default: i64) -> usize {
        let limit = if requested <= 0 || requested > self.max_limit {
            default
        } else {
            requested
        };
        usize::try_from(limit.max(1)).unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            pool_size: env_or("DB_POOL_SIZE", DEFAULT_POOL_SIZE)?,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
