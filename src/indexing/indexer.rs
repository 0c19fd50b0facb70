//! Full-project indexing: establish a baseline agreement between the
//! source tree, the local cache, and the remote index.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::config::Settings;
use crate::extract::SymbolExtractor;
use crate::remote::{FileSymbols, InitializeRequest, InitializeResponse, RemoteError, RemoteIndex};
use crate::types::{Symbol, SymbolKind};
use crate::updater::SyncGate;

use super::error::{IndexError, IndexResult};
use super::progress::ProgressSink;
use super::walker::FileWalker;

/// File submitted when extraction yields nothing at all, so the backend
/// accepts initialization instead of rejecting an empty project.
pub const PLACEHOLDER_PATH: &str = "__symsync_placeholder__.py";

/// Runs the initial (or forced) full scan and bulk-initializes the
/// remote index and the local cache together.
pub struct ProjectIndexer {
    settings: Arc<Settings>,
    cache: Arc<RwLock<LocalCache>>,
    remote: Arc<dyn RemoteIndex>,
    extractor: Arc<dyn SymbolExtractor>,
    progress: Arc<dyn ProgressSink>,
    gate: Arc<SyncGate>,
}

impl ProjectIndexer {
    pub fn new(
        settings: Arc<Settings>,
        cache: Arc<RwLock<LocalCache>>,
        remote: Arc<dyn RemoteIndex>,
        extractor: Arc<dyn SymbolExtractor>,
        progress: Arc<dyn ProgressSink>,
        gate: Arc<SyncGate>,
    ) -> Self {
        Self {
            settings,
            cache,
            remote,
            extractor,
            progress,
            gate,
        }
    }

    /// Enumerate source files under the workspace, deterministically
    /// sorted for reproducible batch ordering.
    pub fn discover_files(&self) -> Vec<PathBuf> {
        let root = self.settings.resolved_workspace_root();
        FileWalker::new(Arc::clone(&self.settings)).discover(&root)
    }

    /// Extract symbols for every file in fixed-size batches.
    ///
    /// Within a batch extraction runs concurrently per file; a failing
    /// file is downgraded to an empty symbol set so one unparsable file
    /// cannot abort the scan. The cancel token is checked between
    /// batches only, so in-flight extractions complete and no batch is
    /// half-observed.
    async fn process_in_batches(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> IndexResult<Vec<FileSymbols>> {
        let root = self.settings.resolved_workspace_root();
        let batch_size = self.settings.indexing.batch_size.max(1);
        let total = files.len();
        let mut results: Vec<FileSymbols> = Vec::with_capacity(total);
        let mut processed = 0usize;

        for batch in files.chunks(batch_size) {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }

            let mut tasks: JoinSet<FileSymbols> = JoinSet::new();
            for file in batch {
                let extractor = Arc::clone(&self.extractor);
                let file = file.clone();
                let rel = relative_path(&root, &file);
                tasks.spawn(async move {
                    let symbols = match extractor.extract(&file).await {
                        Ok(symbols) => symbols,
                        Err(e) => {
                            warn!("extraction failed for {}: {e}", file.display());
                            Vec::new()
                        }
                    };
                    FileSymbols { path: rel, symbols }
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let file_symbols = joined.map_err(|e| IndexError::TaskFailed {
                    reason: e.to_string(),
                })?;
                results.push(file_symbols);
            }

            processed += batch.len();
            self.progress
                .report(processed, total, "extracting symbols");

            // Let other tasks run between batches
            tokio::task::yield_now().await;
        }

        // JoinSet completion order is arbitrary; restore discovery order
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    /// Discovery -> batched extraction -> one bulk initialize call ->
    /// populate and persist the local cache at version 1.
    pub async fn initialize(&self, cancel: &CancellationToken) -> IndexResult<InitializeResponse> {
        let root = self.settings.resolved_workspace_root();
        let files = self.discover_files();
        info!("indexing {} files under {}", files.len(), root.display());

        let extracted = self.process_in_batches(&files, cancel).await?;

        // Files without symbols are logically absent from the index
        let mut to_send: Vec<FileSymbols> = extracted
            .into_iter()
            .filter(|f| !f.symbols.is_empty())
            .collect();

        if to_send.is_empty() {
            warn!(
                "no symbols extracted from {} files; submitting a placeholder so the \
                 backend accepts initialization",
                files.len()
            );
            to_send.push(placeholder_file());
        }

        let project_id = derive_project_id(&root);
        let request = InitializeRequest {
            project_id: project_id.clone(),
            workspace_path: root.to_string_lossy().into_owned(),
            language: self.settings.backend.language.clone(),
            files: to_send.clone(),
        };

        let response = self.remote.initialize_project(&request).await?;
        info!(
            "backend indexed {} files / {} symbols for {project_id}",
            response.indexed_files, response.indexed_symbols
        );

        let mut cache = self.cache.write().await;
        cache.begin_project(&project_id);
        for file in to_send {
            cache.set_symbols(&file.path, file.symbols)?;
        }
        cache.set_version(1)?;
        cache.mark_indexed_now()?;
        cache.save()?;

        Ok(response)
    }

    /// Delete the remote project (already-gone counts as deleted), wipe
    /// the local cache, and rebuild from scratch. The only supported
    /// recovery once automatic conflict recovery has failed; a success
    /// clears the global blocked gate.
    pub async fn reindex(&self, cancel: &CancellationToken) -> IndexResult<InitializeResponse> {
        let project_id = {
            let cache = self.cache.read().await;
            cache.project_id().map(String::from)
        };

        if let Some(project_id) = project_id {
            match self.remote.delete_project(&project_id).await {
                Ok(()) => debug!("deleted remote project {project_id}"),
                Err(RemoteError::NotFound) => {
                    debug!("remote project {project_id} already gone")
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.cache.write().await.clear();

        let response = self.initialize(cancel).await?;
        self.gate.unblock();
        Ok(response)
    }
}

/// Stable project identity derived from the workspace path, so that
/// re-initializing the same workspace addresses the same backend
/// project.
pub fn derive_project_id(workspace: &Path) -> String {
    let canonical = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("proj-{hex}")
}

fn placeholder_file() -> FileSymbols {
    FileSymbols {
        path: PLACEHOLDER_PATH.to_string(),
        symbols: vec![Symbol::new(
            "__symsync_placeholder__",
            SymbolKind::Function,
            "def __symsync_placeholder__()",
        )],
    }
}

/// Workspace-relative cache key for a file, with forward slashes.
pub(crate) fn relative_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}
