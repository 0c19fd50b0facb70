//! Error types for local cache persistence.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read cache file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write cache file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialization(String),

    #[error("no project cache loaded; run a full index first")]
    NotInitialized,
}

pub type CacheResult<T> = Result<T, CacheError>;
