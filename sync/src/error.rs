//! Error types for the sync runtime.

use thiserror::Error;

/// Failures talking to the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote store returned HTTP {0}")]
    Status(u16),

    #[error("permission denied by remote store")]
    PermissionDenied,

    #[error("could not decode remote document: {0}")]
    Decode(String),

    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid remote url: {0}")]
    InvalidUrl(String),
}

/// Failures of a pull or push.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("local store error: {0}")]
    Local(#[from] stride_engine::Error),

    #[error("no account is signed in")]
    SignedOut,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
