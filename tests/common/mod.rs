//! Shared test fixtures: an in-memory backend implementing the remote
//! index trait, plus workspace scaffolding helpers.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::RwLock;

use symsync::cache::LocalCache;
use symsync::config::Settings;
use symsync::extract::PythonExtractor;
use symsync::indexing::{NullProgress, ProjectIndexer};
use symsync::remote::{
    ChangeAction, FileAction, FileSymbols, IncrementalUpdateRequest, IncrementalUpdateResponse,
    InitializeRequest, InitializeResponse, ProjectSnapshot, ProjectStatus, RemoteError,
    RemoteIndex, RemoteResult,
};
use symsync::types::Symbol;
use symsync::updater::{IncrementalUpdater, SyncGate};

/// Scripted failure for the next (or every) incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    #[default]
    None,
    ConnectionOnce,
    AlwaysConflict,
}

#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    pub initialize: usize,
    pub incremental: usize,
    pub status: usize,
    pub snapshot: usize,
    pub delete: usize,
    pub health: usize,
}

#[derive(Debug, Default)]
struct StoredProject {
    project_id: String,
    workspace_path: String,
    version: u64,
    files: BTreeMap<String, Vec<Symbol>>,
}

#[derive(Debug, Default)]
struct BackendState {
    project: Option<StoredProject>,
    healthy: bool,
    fail_mode: FailMode,
    calls: CallCounts,
}

/// In-memory stand-in for the remote index service. Enforces the same
/// optimistic-lock rule the real backend does: an incremental update
/// whose version does not match the stored version is a conflict.
#[derive(Debug)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState {
                healthy: true,
                ..Default::default()
            }),
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn version(&self) -> Option<u64> {
        self.state.lock().unwrap().project.as_ref().map(|p| p.version)
    }

    pub fn stored_files(&self) -> BTreeMap<String, Vec<Symbol>> {
        self.state
            .lock()
            .unwrap()
            .project
            .as_ref()
            .map(|p| p.files.clone())
            .unwrap_or_default()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.lock().unwrap().healthy = healthy;
    }

    pub fn set_fail_mode(&self, mode: FailMode) {
        self.state.lock().unwrap().fail_mode = mode;
    }

    pub fn drop_project(&self) {
        self.state.lock().unwrap().project = None;
    }

    /// Simulate another client racing us: apply a change with the
    /// correct version, advancing the stored version past what the
    /// local cache last acknowledged.
    pub fn apply_external_change(&self, path: &str, symbols: Vec<Symbol>) {
        let mut state = self.state.lock().unwrap();
        let project = state.project.as_mut().expect("project must exist");
        if symbols.is_empty() {
            project.files.remove(path);
        } else {
            project.files.insert(path.to_string(), symbols);
        }
        project.version += 1;
    }
}

fn apply_changes(project: &mut StoredProject, req: &IncrementalUpdateRequest) -> u64 {
    let mut applied = 0u64;
    for change in &req.changes {
        match change.action {
            FileAction::Deleted => {
                project.files.remove(&change.file_path);
                applied += 1;
            }
            FileAction::Modified => {
                let entry = project.files.entry(change.file_path.clone()).or_default();
                for symbol_change in change.symbols_changed.iter().flatten() {
                    match symbol_change.action {
                        ChangeAction::Added | ChangeAction::Modified => {
                            if let Some(existing) = entry
                                .iter_mut()
                                .find(|s| s.name == symbol_change.symbol.name)
                            {
                                *existing = symbol_change.symbol.clone();
                            } else {
                                entry.push(symbol_change.symbol.clone());
                            }
                        }
                        ChangeAction::Deleted => {
                            entry.retain(|s| s.name != symbol_change.symbol.name);
                        }
                    }
                    applied += 1;
                }
                if project.files.get(&change.file_path).is_some_and(|v| v.is_empty()) {
                    project.files.remove(&change.file_path);
                }
            }
        }
    }
    applied
}

#[async_trait]
impl RemoteIndex for FakeBackend {
    async fn initialize_project(
        &self,
        req: &InitializeRequest,
    ) -> RemoteResult<InitializeResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.initialize += 1;

        let files: BTreeMap<String, Vec<Symbol>> = req
            .files
            .iter()
            .map(|f| (f.path.clone(), f.symbols.clone()))
            .collect();
        let indexed_files = files.len() as u64;
        let indexed_symbols = files.values().map(|s| s.len() as u64).sum();

        state.project = Some(StoredProject {
            project_id: req.project_id.clone(),
            workspace_path: req.workspace_path.clone(),
            version: 1,
            files,
        });

        Ok(InitializeResponse {
            project_id: req.project_id.clone(),
            status: "ok".to_string(),
            indexed_files,
            indexed_symbols,
            processing_time_ms: 1,
        })
    }

    async fn incremental_update(
        &self,
        project_id: &str,
        req: &IncrementalUpdateRequest,
    ) -> RemoteResult<IncrementalUpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.incremental += 1;

        match state.fail_mode {
            FailMode::ConnectionOnce => {
                state.fail_mode = FailMode::None;
                return Err(RemoteError::Connection {
                    reason: "connection refused".to_string(),
                });
            }
            FailMode::AlwaysConflict => {
                return Err(RemoteError::Conflict {
                    message: "version is stale".to_string(),
                });
            }
            FailMode::None => {}
        }

        let project = state.project.as_mut().ok_or(RemoteError::NotFound)?;
        if project.project_id != project_id {
            return Err(RemoteError::NotFound);
        }
        if req.version != project.version {
            return Err(RemoteError::Conflict {
                message: format!(
                    "expected version {}, got {}",
                    project.version, req.version
                ),
            });
        }

        let changes_applied = apply_changes(project, req);
        project.version += 1;

        Ok(IncrementalUpdateResponse {
            project_id: project_id.to_string(),
            version: project.version,
            updated_at: Utc::now(),
            changes_applied,
            processing_time_ms: 1,
        })
    }

    async fn project_status(&self, project_id: &str) -> RemoteResult<ProjectStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.status += 1;

        if !state.healthy {
            return Err(RemoteError::Connection {
                reason: "connection refused".to_string(),
            });
        }

        match &state.project {
            Some(p) if p.project_id == project_id => Ok(ProjectStatus {
                status: "ok".to_string(),
                version: Some(p.version),
                indexed_files: Some(p.files.len() as u64),
                indexed_symbols: Some(p.files.values().map(|s| s.len() as u64).sum()),
                last_updated_at: Some(Utc::now()),
            }),
            _ => Ok(ProjectStatus {
                status: "not_found".to_string(),
                version: None,
                indexed_files: None,
                indexed_symbols: None,
                last_updated_at: None,
            }),
        }
    }

    async fn fetch_snapshot(&self, project_id: &str) -> RemoteResult<ProjectSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.calls.snapshot += 1;

        match &state.project {
            Some(p) if p.project_id == project_id => Ok(ProjectSnapshot {
                project_id: p.project_id.clone(),
                version: p.version,
                workspace_path: p.workspace_path.clone(),
                files: p
                    .files
                    .iter()
                    .map(|(path, symbols)| FileSymbols {
                        path: path.clone(),
                        symbols: symbols.clone(),
                    })
                    .collect(),
            }),
            _ => Err(RemoteError::NotFound),
        }
    }

    async fn delete_project(&self, project_id: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;

        match &state.project {
            Some(p) if p.project_id == project_id => {
                state.project = None;
                Ok(())
            }
            _ => Err(RemoteError::NotFound),
        }
    }

    async fn health(&self) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.health += 1;
        if state.healthy {
            Ok(())
        } else {
            Err(RemoteError::Connection {
                reason: "connection refused".to_string(),
            })
        }
    }
}

/// Everything a scenario needs, wired against one temp workspace.
pub struct TestEngine {
    pub settings: Arc<Settings>,
    pub cache: Arc<RwLock<LocalCache>>,
    pub backend: Arc<FakeBackend>,
    pub gate: Arc<SyncGate>,
    pub indexer: ProjectIndexer,
    pub updater: IncrementalUpdater,
}

pub fn engine_for(workspace: &Path) -> TestEngine {
    let settings = Arc::new(Settings {
        workspace_root: Some(workspace.to_path_buf()),
        ..Settings::default()
    });

    let cache = Arc::new(RwLock::new(LocalCache::new(
        settings.cache_path(),
        workspace.to_path_buf(),
        settings.sync.max_cache_age_days,
    )));

    let backend = Arc::new(FakeBackend::new());
    let extractor = Arc::new(PythonExtractor::new());
    let gate = Arc::new(SyncGate::new());

    let indexer = ProjectIndexer::new(
        Arc::clone(&settings),
        Arc::clone(&cache),
        backend.clone() as Arc<dyn RemoteIndex>,
        extractor.clone(),
        Arc::new(NullProgress),
        Arc::clone(&gate),
    );

    let updater = IncrementalUpdater::new(
        Arc::clone(&cache),
        backend.clone() as Arc<dyn RemoteIndex>,
        extractor,
        Arc::clone(&gate),
    );

    TestEngine {
        settings,
        cache,
        backend,
        gate,
        indexer,
        updater,
    }
}

pub fn write_file(workspace: &Path, rel: &str, contents: &str) {
    let path = workspace.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
