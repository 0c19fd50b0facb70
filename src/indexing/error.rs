//! Error types for full-project indexing.

use thiserror::Error;

use crate::cache::CacheError;
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Cooperative cancellation between batches. Distinct from failure:
    /// nothing was committed remotely.
    #[error("indexing cancelled")]
    Cancelled,

    #[error("remote index error: {0}")]
    Remote(#[from] RemoteError),

    #[error("local cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("extraction task panicked: {reason}")]
    TaskFailed { reason: String },
}

pub type IndexResult<T> = Result<T, IndexError>;
