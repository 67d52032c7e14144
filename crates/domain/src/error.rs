//! Store-level error type.

use thiserror::Error;

/// Failure reported by a store implementation.
///
/// `Unavailable` covers transient persistence failures; callers propagate it
/// instead of masking it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<validator::ValidationError> for StoreError {
    fn from(err: validator::ValidationError) -> Self {
        StoreError::Validation(
            err.message
                .map(|m| m.into_owned())
                .unwrap_or_else(|| err.code.into_owned()),
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
