use diesel::result::Error as DieselError;
use thiserror::Error;

use super::ItemId;

// Failures of the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
    #[error("Internal store error: {0}")]
    Internal(String),
}

// Errors surfaced by the scheduling engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Item {0} not found in catalog")]
    ItemNotFound(ItemId),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },
}
