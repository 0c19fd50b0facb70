//! File-watch event loop feeding the incremental updater.
//!
//! Bridges `notify` events into the tokio world over an mpsc channel,
//! debounces saves per path, and bypasses debounce for deletions.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use crate::config::{STATE_DIR, Settings};
use crate::indexing::FileWalker;
use crate::indexing::indexer::relative_path;
use crate::updater::{DebounceTable, IncrementalUpdater, SyncOutcome};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("cannot watch {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("event channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Watches the workspace and drives the updater.
pub struct SyncWatcher {
    updater: Arc<IncrementalUpdater>,
    walker: FileWalker,
    workspace_root: PathBuf,
    debounce: DebounceTable,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    _watcher: notify::RecommendedWatcher,
}

impl SyncWatcher {
    pub fn new(
        settings: Arc<Settings>,
        updater: Arc<IncrementalUpdater>,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(256);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let workspace_root = settings.resolved_workspace_root();
        let debounce = DebounceTable::new(settings.sync.debounce_ms);

        Ok(Self {
            updater,
            walker: FileWalker::new(settings),
            workspace_root,
            debounce,
            event_rx: rx,
            _watcher: watcher,
        })
    }

    /// Run until the event channel closes.
    pub async fn run(mut self) -> Result<(), WatchError> {
        let root = self.workspace_root.clone();
        self._watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        info!("watching {} for source changes", root.display());

        loop {
            let tick = sleep(Duration::from_millis(100));
            tokio::pin!(tick);

            tokio::select! {
                maybe_event = self.event_rx.recv() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event).await,
                        Some(Err(e)) => error!("file watch error: {e}"),
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                _ = &mut tick => {
                    for path in self.debounce.take_due() {
                        self.sync_path(&path).await;
                    }
                }
            }
        }
    }

    async fn handle_event(&mut self, event: Event) {
        for path in event.paths {
            if !self.is_relevant(&path) {
                continue;
            }

            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    self.debounce.schedule(path);
                }
                EventKind::Remove(_) => {
                    // Deletion is unambiguous: skip the quiet period
                    self.debounce.cancel(&path);
                    self.sync_deletion(&path).await;
                }
                _ => {}
            }
        }
    }

    /// Source files only, and never our own state directory (writing
    /// cache.json after each sync must not feed back into the watcher).
    fn is_relevant(&self, path: &Path) -> bool {
        if path.components().any(|c| c.as_os_str() == STATE_DIR) {
            return false;
        }
        self.walker.is_source_file(path)
    }

    /// Process a path whose debounce deadline fired. Editors that
    /// rename-on-save can surface deletions as modifications, so a
    /// vanished file is routed to deletion handling.
    async fn sync_path(&self, path: &Path) {
        if !path.exists() {
            self.sync_deletion(path).await;
            return;
        }

        let rel = relative_path(&self.workspace_root, path);
        match self.updater.sync_file(&rel, path).await {
            Ok(outcome) => log_outcome(&rel, outcome),
            Err(e) => error!("{rel}: sync failed: {e}"),
        }
    }

    async fn sync_deletion(&self, path: &Path) {
        let rel = relative_path(&self.workspace_root, path);
        match self.updater.sync_deletion(&rel).await {
            Ok(outcome) => log_outcome(&rel, outcome),
            Err(e) => error!("{rel}: deletion sync failed: {e}"),
        }
    }
}

fn log_outcome(rel: &str, outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Synced { version } => debug!("{rel}: at version {version}"),
        SyncOutcome::NoChanges => debug!("{rel}: unchanged"),
        SyncOutcome::Deferred => debug!("{rel}: deferred until next save"),
        SyncOutcome::ProjectMissing => warn!("{rel}: project not initialized on backend"),
        SyncOutcome::Blocked => warn!("{rel}: sync is blocked pending reindex"),
    }
}
