//! Error types for the synchronization layer.

use std::time::Duration;
use thiserror::Error;

/// Main error type for store and client operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote service rejected the call. Domain rejections (e.g.
    /// insufficient gold) and transport failures both surface here; the
    /// message is passed through verbatim.
    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("not authenticated")]
    NotAuthenticated,

    /// A bag mutation targeted an entry the local cache does not hold.
    #[error("unknown bag entry: {0}")]
    UnknownEntry(u64),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("subscription failed: {0}")]
    Subscription(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::MalformedPayload(e.to_string())
    }
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
