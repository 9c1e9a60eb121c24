use std::sync::PoisonError;

use crate::data::models::StoreError;

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Internal("store lock poisoned".into())
    }
}

impl StoreError {
    /// Whether the failure is expected to clear up on its own (pool exhausted,
    /// database locked) as opposed to a broken query or row.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::DatabaseError(diesel::result::Error::DatabaseError(_, info)) => {
                let message = info.message();
                message.contains("database is locked") || message.contains("database is busy")
            }
            _ => false,
        }
    }
}
