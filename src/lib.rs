//! symsync keeps a local cache of source-code symbols synchronized with
//! a remote context index as files change, under an optimistic-lock
//! version protocol with automatic conflict recovery.

pub mod cache;
pub mod config;
pub mod extract;
pub mod indexing;
pub mod logging;
pub mod remote;
pub mod status;
pub mod types;
pub mod updater;
pub mod watch;

pub use cache::{LocalCache, ProjectCache};
pub use config::Settings;
pub use extract::{NoopExtractor, PythonExtractor, SymbolExtractor};
pub use indexing::{ProgressSink, ProjectIndexer};
pub use remote::{RemoteIndex, RemoteIndexClient};
pub use status::IndexStatus;
pub use types::{Symbol, SymbolKind};
pub use updater::{IncrementalUpdater, SyncGate, SyncOutcome};
pub use watch::SyncWatcher;
