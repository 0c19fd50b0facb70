//! Error taxonomy for the remote index service.

use thiserror::Error;

/// Normalized failures from the remote index service.
///
/// Every transport- or protocol-level failure collapses into one of
/// these variants so callers can branch on recovery strategy instead of
/// inspecting raw HTTP details.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("backend unreachable: {reason}")]
    Connection { reason: String },

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("unexpected HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("version conflict: {message}")]
    Conflict { message: String },

    #[error("project not found on the backend")]
    NotFound,

    #[error("invalid response payload: {reason}")]
    InvalidResponse { reason: String },
}

impl RemoteError {
    /// Transient failures: nothing was applied remotely, the next
    /// natural trigger simply retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
