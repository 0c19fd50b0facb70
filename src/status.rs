//! Project status projection for display surfaces.

use std::fmt;

use crate::cache::LocalCache;
use crate::extract::{ExtractorReadiness, SymbolExtractor};
use crate::remote::RemoteIndex;

/// Where the project stands, from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// No cache exists for this workspace yet.
    NotIndexed,
    /// The extraction capability is still warming up.
    WaitingForExtractor,
    /// No extraction capability is available.
    ExtractorNotReady,
    /// Cache present and valid.
    Indexed,
    /// Cache present but stale or no longer matching the backend.
    Outdated,
    /// The backend did not answer its health probe.
    BackendDown,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotIndexed => "not indexed",
            Self::WaitingForExtractor => "waiting for symbol extractor",
            Self::ExtractorNotReady => "symbol extractor unavailable",
            Self::Indexed => "indexed",
            Self::Outdated => "outdated",
            Self::BackendDown => "backend unreachable",
        };
        f.write_str(text)
    }
}

/// Compute the status projection from backend health, cache state, and
/// extractor readiness.
pub async fn project_status(
    cache: &LocalCache,
    remote: &dyn RemoteIndex,
    extractor: &dyn SymbolExtractor,
) -> IndexStatus {
    if remote.health().await.is_err() {
        return IndexStatus::BackendDown;
    }

    if !cache.is_indexed() {
        return match extractor.readiness() {
            ExtractorReadiness::Starting => IndexStatus::WaitingForExtractor,
            ExtractorReadiness::Unavailable => IndexStatus::ExtractorNotReady,
            ExtractorReadiness::Ready => IndexStatus::NotIndexed,
        };
    }

    if cache.is_valid(remote).await {
        IndexStatus::Indexed
    } else {
        IndexStatus::Outdated
    }
}
