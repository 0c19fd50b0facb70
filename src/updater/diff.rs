//! Structural symbol diffing for one file.
//!
//! Symbols are matched by bare name within the file. A rename therefore
//! shows up as one deletion plus one addition; this is documented
//! behavior, not an oversight (no structural matching across renames).
//! Line-number shifts alone never count as a change: unrelated edits
//! elsewhere in the file move them constantly.

use std::collections::HashMap;

use crate::remote::{ChangeAction, SymbolChange};
use crate::types::Symbol;

/// The outcome of diffing a file's old and new symbol sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolDiff {
    /// Present in the new set only. Carries the new symbol.
    pub added: Vec<Symbol>,
    /// Present in both with differing signature, kind, or ordered call
    /// list. Carries the new symbol.
    pub modified: Vec<Symbol>,
    /// Present in the old set only. Carries the old symbol.
    pub deleted: Vec<Symbol>,
}

impl SymbolDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Flatten into the wire representation.
    pub fn into_changes(self) -> Vec<SymbolChange> {
        let mut changes =
            Vec::with_capacity(self.added.len() + self.modified.len() + self.deleted.len());
        for symbol in self.added {
            changes.push(SymbolChange {
                action: ChangeAction::Added,
                symbol,
            });
        }
        for symbol in self.modified {
            changes.push(SymbolChange {
                action: ChangeAction::Modified,
                symbol,
            });
        }
        for symbol in self.deleted {
            changes.push(SymbolChange {
                action: ChangeAction::Deleted,
                symbol,
            });
        }
        changes
    }
}

/// Diff two symbol sets keyed by name.
pub fn diff_symbols(old: &[Symbol], new: &[Symbol]) -> SymbolDiff {
    let old_by_name: HashMap<&str, &Symbol> =
        old.iter().map(|s| (s.name.as_str(), s)).collect();
    let new_by_name: HashMap<&str, &Symbol> =
        new.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut diff = SymbolDiff::default();

    for symbol in new {
        match old_by_name.get(symbol.name.as_str()) {
            None => diff.added.push(symbol.clone()),
            Some(previous) if symbol.differs_from(previous) => {
                diff.modified.push(symbol.clone())
            }
            Some(_) => {}
        }
    }

    for symbol in old {
        if !new_by_name.contains_key(symbol.name.as_str()) {
            diff.deleted.push(symbol.clone());
        }
    }

    diff
}
