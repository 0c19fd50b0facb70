//! Incremental synchronization: keeps the local cache and the remote
//! project record converged as individual files change, with the fewest
//! possible network calls, under the optimistic-lock version protocol.
//!
//! Per-file flow: debounce expiry -> extract current symbols -> diff
//! against the cache -> (if non-empty) send one incremental update
//! carrying the last acknowledged version -> on success adopt the
//! server's version and the new symbols. A version conflict triggers
//! automatic recovery: refetch the authoritative snapshot, repopulate
//! the cache, re-extract, recompute the diff against the fresh cache,
//! and retry exactly once. A failed recovery blocks all further
//! incremental sync until a full reindex.

pub mod debounce;
pub mod diff;
pub mod gate;

pub use debounce::DebounceTable;
pub use diff::{SymbolDiff, diff_symbols};
pub use gate::SyncGate;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheError, LocalCache};
use crate::extract::{ExtractError, SymbolExtractor};
use crate::remote::{
    FileAction, FileChange, IncrementalUpdateRequest, RemoteError, RemoteIndex,
};
use crate::types::Symbol;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("symbol extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("local cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("remote index error: {0}")]
    Remote(#[from] RemoteError),
}

pub type UpdateResult<T> = Result<T, UpdateError>;

/// What happened to one scheduled sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The diff was empty; no network call was made.
    NoChanges,
    /// The backend acknowledged the update at this version.
    Synced { version: u64 },
    /// Transient backend failure; nothing was applied, the next save
    /// retries naturally.
    Deferred,
    /// The backend no longer knows this project; a full initialize is
    /// needed.
    ProjectMissing,
    /// The global gate is set (or was set by a failed recovery);
    /// nothing was sent.
    Blocked,
}

/// How to apply a successful update to the local cache.
enum CacheApply {
    Set(Vec<Symbol>),
    Remove,
}

pub struct IncrementalUpdater {
    cache: Arc<RwLock<LocalCache>>,
    remote: Arc<dyn RemoteIndex>,
    extractor: Arc<dyn SymbolExtractor>,
    gate: Arc<SyncGate>,
}

impl IncrementalUpdater {
    pub fn new(
        cache: Arc<RwLock<LocalCache>>,
        remote: Arc<dyn RemoteIndex>,
        extractor: Arc<dyn SymbolExtractor>,
        gate: Arc<SyncGate>,
    ) -> Self {
        Self {
            cache,
            remote,
            extractor,
            gate,
        }
    }

    pub fn gate(&self) -> &SyncGate {
        &self.gate
    }

    /// Sync a saved or created file: extract, diff against the cache,
    /// and push the diff if there is one.
    ///
    /// `rel_path` is the cache key (workspace-relative), `abs_path` the
    /// on-disk location handed to the extractor.
    pub async fn sync_file(&self, rel_path: &str, abs_path: &Path) -> UpdateResult<SyncOutcome> {
        if self.gate.is_blocked() {
            info!("sync blocked, skipping {rel_path}; run a full reindex to resume");
            return Ok(SyncOutcome::Blocked);
        }
        if self.cache.read().await.project_id().is_none() {
            warn!("no project cache; run initialize before incremental sync");
            return Ok(SyncOutcome::ProjectMissing);
        }

        let new_symbols = self.extractor.extract(abs_path).await?;

        let (diff, version) = {
            let cache = self.cache.read().await;
            let old = cache.symbols(rel_path).unwrap_or(&[]);
            (diff_symbols(old, &new_symbols), cache.version())
        };

        if diff.is_empty() {
            debug!("{rel_path}: no structural change");
            return Ok(SyncOutcome::NoChanges);
        }

        let request = file_update(rel_path, FileAction::Modified, diff, version);
        self.push(rel_path, Some(abs_path), CacheApply::Set(new_symbols), request)
            .await
    }

    /// Sync a deleted file. Deletion is unambiguous, so callers invoke
    /// this directly without debouncing: every previously-known symbol
    /// in the file is marked deleted.
    pub async fn sync_deletion(&self, rel_path: &str) -> UpdateResult<SyncOutcome> {
        if self.gate.is_blocked() {
            info!("sync blocked, skipping deletion of {rel_path}");
            return Ok(SyncOutcome::Blocked);
        }

        let (known, version) = {
            let cache = self.cache.read().await;
            if cache.project_id().is_none() {
                warn!("no project cache; run initialize before incremental sync");
                return Ok(SyncOutcome::ProjectMissing);
            }
            (cache.symbols(rel_path).is_some(), cache.version())
        };
        if !known {
            debug!("{rel_path}: deleted file was not in the cache");
            return Ok(SyncOutcome::NoChanges);
        }

        let request = IncrementalUpdateRequest {
            version,
            changes: vec![FileChange {
                file_path: rel_path.to_string(),
                action: FileAction::Deleted,
                symbols_changed: None,
            }],
        };
        self.push(rel_path, None, CacheApply::Remove, request).await
    }

    /// Send one incremental update and route the result: success
    /// applies to the cache, conflict runs recovery, transient errors
    /// defer to the next save.
    async fn push(
        &self,
        rel_path: &str,
        abs_path: Option<&Path>,
        apply: CacheApply,
        request: IncrementalUpdateRequest,
    ) -> UpdateResult<SyncOutcome> {
        let project_id = self
            .cache
            .read()
            .await
            .project_id()
            .map(String::from)
            .ok_or(CacheError::NotInitialized)?;

        match self.remote.incremental_update(&project_id, &request).await {
            Ok(response) => {
                self.apply_success(rel_path, apply, response.version).await?;
                info!("{rel_path}: synced at version {}", response.version);
                Ok(SyncOutcome::Synced {
                    version: response.version,
                })
            }
            Err(RemoteError::Conflict { message }) => {
                warn!("{rel_path}: version conflict ({message}), recovering");
                self.recover_and_retry(&project_id, rel_path, abs_path).await
            }
            Err(e) if e.is_transient() => {
                debug!("{rel_path}: backend unavailable ({e}); will retry on next save");
                Ok(SyncOutcome::Deferred)
            }
            Err(RemoteError::NotFound) => {
                warn!("{rel_path}: project missing server-side; run a full initialize");
                Ok(SyncOutcome::ProjectMissing)
            }
            Err(e) => {
                warn!("{rel_path}: update rejected ({e}); will retry on next save");
                Ok(SyncOutcome::Deferred)
            }
        }
    }

    async fn apply_success(
        &self,
        rel_path: &str,
        apply: CacheApply,
        version: u64,
    ) -> UpdateResult<()> {
        let mut cache = self.cache.write().await;
        match apply {
            CacheApply::Set(symbols) => cache.set_symbols(rel_path, symbols)?,
            CacheApply::Remove => cache.remove_file(rel_path)?,
        }
        cache.set_version(version)?;
        cache.save()?;
        Ok(())
    }

    /// Automatic conflict recovery. Any failure in here, including a
    /// second conflict, abandons recovery and sets the global blocked
    /// gate: updates computed against cache state known to be wrong
    /// must never be sent silently.
    async fn recover_and_retry(
        &self,
        project_id: &str,
        rel_path: &str,
        abs_path: Option<&Path>,
    ) -> UpdateResult<SyncOutcome> {
        match self.try_recover(project_id, rel_path, abs_path).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    "conflict recovery for {rel_path} failed: {e}; blocking all incremental \
                     sync until a successful reindex"
                );
                self.gate.block();
                Ok(SyncOutcome::Blocked)
            }
        }
    }

    async fn try_recover(
        &self,
        project_id: &str,
        rel_path: &str,
        abs_path: Option<&Path>,
    ) -> UpdateResult<SyncOutcome> {
        // 1. The backend is the source of truth: fetch its view.
        let snapshot = self.remote.fetch_snapshot(project_id).await?;

        // 2. Repopulate the cache from the snapshot, keeping identity.
        {
            let mut cache = self.cache.write().await;
            cache.clear_symbols_only()?;
            for file in &snapshot.files {
                cache.set_symbols(&file.path, file.symbols.clone())?;
            }
            cache.set_version(snapshot.version)?;
            cache.save()?;
        }
        info!("cache repopulated from snapshot at version {}", snapshot.version);

        // 3. The file may have changed again during the round-trip:
        //    re-extract and recompute the diff against the fresh cache.
        //    Reusing the pre-recovery diff would resurrect the stale
        //    base state the conflict just told us about.
        let new_symbols = match abs_path {
            Some(path) => self.extractor.extract(path).await?,
            None => Vec::new(),
        };

        let (diff, version) = {
            let cache = self.cache.read().await;
            let old = cache.symbols(rel_path).unwrap_or(&[]);
            (diff_symbols(old, &new_symbols), cache.version())
        };

        if diff.is_empty() {
            debug!("{rel_path}: snapshot already reflects the local state");
            return Ok(SyncOutcome::Synced { version });
        }

        // 4. Retry exactly once with the fresh version.
        let (action, apply) = if abs_path.is_some() {
            (FileAction::Modified, CacheApply::Set(new_symbols))
        } else {
            (FileAction::Deleted, CacheApply::Remove)
        };
        let request = file_update(rel_path, action, diff, version);

        let response = self.remote.incremental_update(project_id, &request).await?;
        self.apply_success(rel_path, apply, response.version).await?;
        info!(
            "{rel_path}: recovered and synced at version {}",
            response.version
        );
        Ok(SyncOutcome::Synced {
            version: response.version,
        })
    }
}

fn file_update(
    rel_path: &str,
    action: FileAction,
    diff: SymbolDiff,
    version: u64,
) -> IncrementalUpdateRequest {
    let symbols_changed = match action {
        FileAction::Modified => Some(diff.into_changes()),
        FileAction::Deleted => None,
    };
    IncrementalUpdateRequest {
        version,
        changes: vec![FileChange {
            file_path: rel_path.to_string(),
            action,
            symbols_changed,
        }],
    }
}
