//! Full-project (batch) indexing.

pub mod error;
pub mod indexer;
pub mod progress;
pub mod walker;

pub use error::{IndexError, IndexResult};
pub use indexer::{PLACEHOLDER_PATH, ProjectIndexer, derive_project_id};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use walker::FileWalker;
