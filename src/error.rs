use std::time::Duration;

use thiserror::Error;

/// A failure that aborts the fetch loop.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("page {page}: API returned {status}")]
    Status { page: u32, status: u16 },

    /// Well-formed payload with `success: false`
    #[error("page {page}: API returned success=false ({message})")]
    Rejected { page: u32, message: String },

    #[error("page {page}: malformed payload: {source}")]
    Malformed {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {page}: no response after {timeout:?}")]
    Timeout { page: u32, timeout: Duration },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),

    /// Offline snapshot is not a record list or page payload
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),
}

impl FetchError {
    /// HTTP status for transport-level failures, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
