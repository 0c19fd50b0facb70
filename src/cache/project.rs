//! The persisted per-workspace cache record and its schema migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::Symbol;

/// Current persisted schema version. Bump when the record shape changes
/// and extend [`migrate`] to backfill older forms.
pub const SCHEMA_VERSION: u32 = 2;

/// Aggregate counts kept in lockstep with the symbol map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub total_files: u64,
    pub total_symbols: u64,
}

/// The whole local view of one project: identity, the optimistic-lock
/// version last acknowledged by the backend, and every file's symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCache {
    pub schema_version: u32,
    pub project_id: String,
    pub workspace_path: PathBuf,
    pub last_indexed_at: DateTime<Utc>,
    /// Last backend version acknowledged for this project. Monotone
    /// non-decreasing; a stale value is exactly what conflict recovery
    /// repairs.
    pub backend_version: u64,
    /// Relative path -> symbols. Files with zero symbols never appear.
    pub file_symbols: BTreeMap<String, Vec<Symbol>>,
    pub statistics: CacheStatistics,
}

impl ProjectCache {
    pub fn new(project_id: impl Into<String>, workspace_path: PathBuf) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            project_id: project_id.into(),
            workspace_path,
            last_indexed_at: Utc::now(),
            backend_version: 1,
            file_symbols: BTreeMap::new(),
            statistics: CacheStatistics::default(),
        }
    }

    /// Replace (or insert) a file's symbols, keeping statistics in step.
    /// An empty symbol list removes the entry entirely.
    pub fn set_symbols(&mut self, path: &str, symbols: Vec<Symbol>) {
        if let Some(old) = self.file_symbols.remove(path) {
            self.statistics.total_files -= 1;
            self.statistics.total_symbols -= old.len() as u64;
        }
        if !symbols.is_empty() {
            self.statistics.total_files += 1;
            self.statistics.total_symbols += symbols.len() as u64;
            self.file_symbols.insert(path.to_string(), symbols);
        }
    }

    /// Drop a file from the cache. Unknown paths are a no-op.
    pub fn remove_file(&mut self, path: &str) {
        if let Some(old) = self.file_symbols.remove(path) {
            self.statistics.total_files -= 1;
            self.statistics.total_symbols -= old.len() as u64;
        }
    }

    /// Recompute statistics from the symbol map.
    pub fn recomputed_statistics(&self) -> CacheStatistics {
        CacheStatistics {
            total_files: self.file_symbols.len() as u64,
            total_symbols: self.file_symbols.values().map(|s| s.len() as u64).sum(),
        }
    }
}

/// Migrate an older (or otherwise mismatched) persisted record.
///
/// Returns `None` when a required identity field is missing or invalid;
/// the caller must then wipe the file rather than accept a partially
/// valid record. Everything optional is defaulted field by field and
/// statistics are recomputed from the symbol map.
pub fn migrate(value: serde_json::Value) -> Option<ProjectCache> {
    let obj = value.as_object()?;

    let project_id = obj.get("project_id")?.as_str()?.to_string();
    let workspace_path = PathBuf::from(obj.get("workspace_path")?.as_str()?);
    let last_indexed_at: DateTime<Utc> =
        serde_json::from_value(obj.get("last_indexed_at")?.clone()).ok()?;

    let backend_version = obj
        .get("backend_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(1);

    let file_symbols: BTreeMap<String, Vec<Symbol>> = obj
        .get("file_symbols")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let mut cache = ProjectCache {
        schema_version: SCHEMA_VERSION,
        project_id,
        workspace_path,
        last_indexed_at,
        backend_version,
        file_symbols,
        statistics: CacheStatistics::default(),
    };
    cache.statistics = cache.recomputed_statistics();
    Some(cache)
}
