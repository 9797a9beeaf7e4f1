//! Error types for the Stride engine.

use crate::schema::Collection;
use crate::storage::StorageError;
use thiserror::Error;

/// All possible errors from the Stride engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("{0} is a singleton, not a record collection")]
    NotARecordCollection(Collection),

    #[error("{0} is a record collection, not a singleton")]
    NotASingleton(Collection),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid import: {0}")]
    InvalidImport(String),

    #[error("cannot defer onboarding by {0} days")]
    DeferralOutOfRange(u32),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
