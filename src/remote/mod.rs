//! Typed client for the remote index service.

pub mod api;
pub mod client;
pub mod error;

pub use api::{
    ChangeAction, FileAction, FileChange, FileSymbols, IncrementalUpdateRequest,
    IncrementalUpdateResponse, InitializeRequest, InitializeResponse, ProjectSnapshot,
    ProjectStatus, SymbolChange,
};
pub use client::{RemoteIndex, RemoteIndexClient};
pub use error::{RemoteError, RemoteResult};
