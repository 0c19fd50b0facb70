//! Layered configuration for the sync client.
//!
//! Sources, lowest to highest precedence:
//! - Built-in defaults
//! - TOML file at `.symsync/settings.toml` (found by ancestor search)
//! - Environment variables prefixed with `SYMSYNC_`, using double
//!   underscores for nesting: `SYMSYNC_SYNC__DEBOUNCE_MS=500` sets
//!   `sync.debounce_ms`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory under the workspace root that holds settings and cache.
pub const STATE_DIR: &str = ".symsync";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Workspace root directory (where the state dir lives).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Remote index service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Full-scan indexing settings.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Incremental sync settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the remote index service.
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Primary language reported at project initialization.
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Files per extraction batch during a full scan.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Glob patterns excluded from discovery, on top of .gitignore.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// File extensions treated as source files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Quiet period before a changed file is synced, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Cache older than this is considered stale.
    #[serde(default = "default_max_cache_age_days")]
    pub max_cache_age_days: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `updater = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:7433".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_language() -> String {
    "python".to_string()
}
fn default_batch_size() -> usize {
    50
}
fn default_ignore_patterns() -> Vec<String> {
    vec![
        "target/**".to_string(),
        "node_modules/**".to_string(),
        ".git/**".to_string(),
        "__pycache__/**".to_string(),
        ".venv/**".to_string(),
        "dist/**".to_string(),
        "build/**".to_string(),
    ]
}
fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "pyi".to_string()]
}
fn default_debounce_ms() -> u64 {
    2000
}
fn default_max_cache_age_days() -> i64 {
    30
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace_root: None,
            backend: BackendConfig::default(),
            indexing: IndexingConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            language: default_language(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            ignore_patterns: default_ignore_patterns(),
            extensions: default_extensions(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_cache_age_days: default_max_cache_age_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(STATE_DIR).join("settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SYMSYNC_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file, for tests and tooling.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Serialize the current settings to a TOML file, creating parents.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, rendered)
    }

    /// Walk up from the current directory looking for the state dir.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let state_dir = ancestor.join(STATE_DIR);
            if state_dir.is_dir() {
                return Some(state_dir.join("settings.toml"));
            }
        }
        None
    }

    /// Workspace root: nearest ancestor containing the state dir.
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            if ancestor.join(STATE_DIR).is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }

    /// Resolved workspace root, falling back to the current directory.
    pub fn resolved_workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .or_else(Self::workspace_root)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Path of the persisted cache record for this workspace.
    pub fn cache_path(&self) -> PathBuf {
        self.resolved_workspace_root().join(STATE_DIR).join("cache.json")
    }
}
