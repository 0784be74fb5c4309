use thiserror::Error;

use crate::cache::WorkerState;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Install failed for {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },

    #[error("No store for version {0} - install first")]
    NotInstalled(String),

    #[error("Invalid version tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Characters allowed in a version tag. Tags double as directory names.
pub(crate) fn validate_tag(tag: &str) -> CacheResult<()> {
    let reason = if tag.is_empty() {
        Some("must not be empty")
    } else if tag == "." || tag == ".." {
        Some("must not be a relative path component")
    } else if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Some("only ASCII letters, digits, '-', '_' and '.' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CacheError::InvalidTag {
            tag: tag.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
