use std::sync::Mutex;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

/// Source of the current time. All timestamps are naive UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Manually driven clock, for replaying review sessions at chosen times.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.at.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut at = self.at.lock().unwrap_or_else(|e| e.into_inner());
        *at += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.at.lock().unwrap_or_else(|e| e.into_inner())
    }
}
