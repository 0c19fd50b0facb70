//! Core value types shared across the cache, indexer, and updater.

use serde::{Deserialize, Serialize};

/// Kind of a source-code symbol tracked by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
}

/// A named symbol extracted from a source file.
///
/// Identity for diffing purposes is `name`, scoped to the containing file.
/// Line numbers are carried for display but never participate in change
/// detection (unrelated edits shift them constantly).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub line_start: u32,
    pub line_end: u32,
    /// Names of symbols this one calls, in source order.
    #[serde(default)]
    pub calls: Vec<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            line_start: 0,
            line_end: 0,
            calls: Vec::new(),
        }
    }

    /// Set the line span.
    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = start;
        self.line_end = end;
        self
    }

    /// Set the outgoing call references.
    pub fn with_calls(mut self, calls: Vec<String>) -> Self {
        self.calls = calls;
        self
    }

    /// True when the structural content differs, ignoring line numbers.
    pub fn differs_from(&self, other: &Symbol) -> bool {
        self.signature != other.signature || self.kind != other.kind || self.calls != other.calls
    }
}
