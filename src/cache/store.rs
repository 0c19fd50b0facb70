//! The local cache manager: persistence, validity rules, and the only
//! mutation path into the per-project symbol map.

use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::remote::RemoteIndex;
use crate::types::Symbol;

use super::error::{CacheError, CacheResult};
use super::project::{ProjectCache, SCHEMA_VERSION, migrate};

/// Owns the [`ProjectCache`] for one workspace. The indexer and updater
/// never touch cache contents except through these methods, which keep
/// the statistics invariant on every mutation.
#[derive(Debug)]
pub struct LocalCache {
    storage_path: PathBuf,
    workspace_root: PathBuf,
    max_age_days: i64,
    cache: Option<ProjectCache>,
}

impl LocalCache {
    pub fn new(storage_path: PathBuf, workspace_root: PathBuf, max_age_days: i64) -> Self {
        Self {
            storage_path,
            workspace_root,
            max_age_days,
            cache: None,
        }
    }

    /// Deserialize persisted state. Fails closed: a record missing any
    /// required identity field is wiped and `None` is returned rather
    /// than a partially valid structure. A schema-version mismatch is
    /// migrated and the migrated form persisted immediately.
    pub fn load(&mut self) -> Option<&ProjectCache> {
        let raw = fs::read_to_string(&self.storage_path).ok()?;

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("cache file is not valid JSON ({e}), wiping");
                self.wipe();
                return None;
            }
        };

        let persisted_schema = value
            .get("schema_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        if persisted_schema != SCHEMA_VERSION {
            debug!("migrating cache from schema v{persisted_schema} to v{SCHEMA_VERSION}");
            match migrate(value) {
                Some(cache) => {
                    self.cache = Some(cache);
                    // Persist the migrated form so future loads skip this path
                    if let Err(e) = self.save() {
                        warn!("failed to persist migrated cache: {e}");
                    }
                }
                None => {
                    warn!("cache record is missing required fields, wiping");
                    self.wipe();
                    return None;
                }
            }
            return self.cache.as_ref();
        }

        match serde_json::from_value::<ProjectCache>(value) {
            Ok(cache) => {
                self.cache = Some(cache);
                self.cache.as_ref()
            }
            Err(e) => {
                warn!("cache record failed to deserialize ({e}), wiping");
                self.wipe();
                None
            }
        }
    }

    /// Serialize the in-memory state. Idempotent and safe to call after
    /// every incremental change.
    pub fn save(&self) -> CacheResult<()> {
        let cache = self.cache.as_ref().ok_or(CacheError::NotInitialized)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::FileWrite {
                path: self.storage_path.clone(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        fs::write(&self.storage_path, json).map_err(|e| CacheError::FileWrite {
            path: self.storage_path.clone(),
            source: e,
        })
    }

    /// Local validity checks only: schema, workspace identity, age.
    pub fn is_valid_locally(&self) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        if cache.schema_version != SCHEMA_VERSION {
            return false;
        }
        if cache.workspace_path != self.workspace_root {
            debug!(
                "cache belongs to {}, workspace is {}",
                cache.workspace_path.display(),
                self.workspace_root.display()
            );
            return false;
        }
        let age = Utc::now() - cache.last_indexed_at;
        age <= Duration::days(self.max_age_days)
    }

    /// Full validity check, including whether the backend still knows
    /// the project. When the remote check itself fails (network down),
    /// validity falls back to the local checks so offline operation
    /// keeps working against a stale-but-plausible cache.
    pub async fn is_valid(&self, remote: &dyn RemoteIndex) -> bool {
        if !self.is_valid_locally() {
            return false;
        }
        let Some(cache) = &self.cache else {
            return false;
        };

        match remote.project_status(&cache.project_id).await {
            Ok(status) => status.is_known(),
            Err(crate::remote::RemoteError::NotFound) => false,
            Err(e) => {
                debug!("remote validity check unavailable ({e}), accepting local checks");
                true
            }
        }
    }

    /// True iff a cache exists and holds at least one indexed file.
    pub fn is_indexed(&self) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|c| c.statistics.total_files > 0)
    }

    /// Start a fresh project record, discarding any previous one.
    pub fn begin_project(&mut self, project_id: &str) {
        self.cache = Some(ProjectCache::new(project_id, self.workspace_root.clone()));
    }

    pub fn project_id(&self) -> Option<&str> {
        self.cache.as_ref().map(|c| c.project_id.as_str())
    }

    pub fn symbols(&self, path: &str) -> Option<&[Symbol]> {
        self.cache
            .as_ref()
            .and_then(|c| c.file_symbols.get(path))
            .map(|v| v.as_slice())
    }

    pub fn set_symbols(&mut self, path: &str, symbols: Vec<Symbol>) -> CacheResult<()> {
        let cache = self.cache.as_mut().ok_or(CacheError::NotInitialized)?;
        cache.set_symbols(path, symbols);
        Ok(())
    }

    pub fn remove_file(&mut self, path: &str) -> CacheResult<()> {
        let cache = self.cache.as_mut().ok_or(CacheError::NotInitialized)?;
        cache.remove_file(path);
        Ok(())
    }

    /// The last backend version acknowledged for this project.
    pub fn version(&self) -> u64 {
        self.cache.as_ref().map(|c| c.backend_version).unwrap_or(0)
    }

    pub fn set_version(&mut self, version: u64) -> CacheResult<()> {
        let cache = self.cache.as_mut().ok_or(CacheError::NotInitialized)?;
        cache.backend_version = version;
        Ok(())
    }

    /// Reset the symbol map and statistics while preserving project
    /// identity and `backend_version`. Used only by conflict recovery
    /// to repopulate from a trusted remote snapshot.
    pub fn clear_symbols_only(&mut self) -> CacheResult<()> {
        let cache = self.cache.as_mut().ok_or(CacheError::NotInitialized)?;
        cache.file_symbols.clear();
        cache.statistics = Default::default();
        Ok(())
    }

    /// Full reset: drop the in-memory record and delete the persisted
    /// file.
    pub fn clear(&mut self) {
        self.cache = None;
        self.wipe();
    }

    pub fn mark_indexed_now(&mut self) -> CacheResult<()> {
        let cache = self.cache.as_mut().ok_or(CacheError::NotInitialized)?;
        cache.last_indexed_at = Utc::now();
        Ok(())
    }

    pub fn project(&self) -> Option<&ProjectCache> {
        self.cache.as_ref()
    }

    /// Paths currently tracked by the cache.
    pub fn file_paths(&self) -> Vec<String> {
        self.cache
            .as_ref()
            .map(|c| c.file_symbols.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn wipe(&mut self) {
        if self.storage_path.exists()
            && let Err(e) = fs::remove_file(&self.storage_path)
        {
            warn!("failed to remove cache file: {e}");
        }
    }

    #[cfg(test)]
    pub(crate) fn cache_mut(&mut self) -> Option<&mut ProjectCache> {
        self.cache.as_mut()
    }
}
