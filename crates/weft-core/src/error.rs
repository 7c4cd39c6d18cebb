//! Error types for the value model and codec.

use thiserror::Error;

/// Errors raised while decoding values and changes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown type tag: {0}")]
    UnknownTag(String),

    #[error("Arity mismatch for {tag}: expected {expected}, found {found}")]
    Arity {
        tag: String,
        expected: usize,
        found: usize,
    },

    #[error("Malformed change: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
