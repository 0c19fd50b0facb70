//! Symbol extraction capability.
//!
//! Extraction is a collaborator the sync engine depends on, not part of
//! the sync protocol itself. The trait has two shipped implementations:
//! a real tree-sitter based Python extractor and [`NoopExtractor`], the
//! degraded form used when no extractor is available. Which one runs is
//! decided at construction, not by runtime feature detection.

pub mod python;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::Symbol;

pub use python::PythonExtractor;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Whether the extractor can currently produce symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorReadiness {
    Ready,
    /// Backing capability is still warming up.
    Starting,
    /// No extraction capability exists in this process.
    Unavailable,
}

/// "Given a document, produce its current symbol list."
#[async_trait]
pub trait SymbolExtractor: Send + Sync {
    fn readiness(&self) -> ExtractorReadiness;

    /// Extract the current symbols of the file at `path`.
    async fn extract(&self, path: &Path) -> ExtractResult<Vec<Symbol>>;
}

/// Degraded extractor: always returns no symbols.
#[derive(Debug, Default)]
pub struct NoopExtractor;

#[async_trait]
impl SymbolExtractor for NoopExtractor {
    fn readiness(&self) -> ExtractorReadiness {
        ExtractorReadiness::Unavailable
    }

    async fn extract(&self, _path: &Path) -> ExtractResult<Vec<Symbol>> {
        Ok(Vec::new())
    }
}
