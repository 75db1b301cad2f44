use std::path::Path;

use thiserror::Error;

/// Failure kinds surfaced by the document store.
///
/// A missing record is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("malformed collection at {path}: {reason}")]
    MalformedState { path: String, reason: String },
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

impl StoreError {
    pub fn storage(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::StorageFailure(format!("{}: {}", path.display(), err))
    }

    pub fn malformed(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::MalformedState {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn invalid_patch(msg: &str) -> Self {
        Self::InvalidPatch(msg.to_string())
    }
}
