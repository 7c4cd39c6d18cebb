//! Error types for synchronization.

use thiserror::Error;
use weft_core::CoreError;

/// Errors raised by sessions, the transformer and the wire protocol.
///
/// Cloneable so a coalesced push or pull can hand the same outcome to
/// every caller awaiting it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Cannot rebase version {version}: journal entry {missing} is unavailable")]
    UnresolvableRebase { version: i64, missing: i64 },

    #[error("Codec error: {0}")]
    Codec(#[from] CoreError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Codec(CoreError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
