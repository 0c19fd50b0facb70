//! Wire types for the remote index protocol (JSON over HTTP).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Symbol;

/// Symbols belonging to one file, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub path: String,
    pub symbols: Vec<Symbol>,
}

/// `POST /context/projects/initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub project_id: String,
    pub workspace_path: String,
    pub language: String,
    pub files: Vec<FileSymbols>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub project_id: String,
    pub status: String,
    pub indexed_files: u64,
    pub indexed_symbols: u64,
    #[serde(default)]
    pub processing_time_ms: u64,
}

/// File-level action in an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Modified,
    Deleted,
}

/// Symbol-level action within a modified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub action: ChangeAction,
    pub symbol: Symbol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    pub action: FileAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols_changed: Option<Vec<SymbolChange>>,
}

/// `PATCH /context/projects/{id}/incremental`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalUpdateRequest {
    /// The caller's last acknowledged backend version. A stale value is
    /// rejected with a conflict.
    pub version: u64,
    pub changes: Vec<FileChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalUpdateResponse {
    pub project_id: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub changes_applied: u64,
    #[serde(default)]
    pub processing_time_ms: u64,
}

/// `GET /context/projects/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub indexed_files: Option<u64>,
    #[serde(default)]
    pub indexed_symbols: Option<u64>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl ProjectStatus {
    pub fn is_known(&self) -> bool {
        self.status == "ok"
    }
}

/// `GET /context/projects/{id}` — the authoritative full snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project_id: String,
    pub version: u64,
    pub workspace_path: String,
    pub files: Vec<FileSymbols>,
}
