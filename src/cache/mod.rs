//! Local symbol cache: the single shared mutable resource of the sync
//! client. All reads and writes go through [`LocalCache`] so the
//! statistics invariant holds at every observation point.

pub mod error;
pub mod project;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use project::{CacheStatistics, ProjectCache, SCHEMA_VERSION};
pub use store::LocalCache;
