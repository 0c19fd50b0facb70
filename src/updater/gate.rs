//! Global emergency stop for incremental synchronization.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set when conflict recovery has failed: the local cache is known to
/// be wrong, so every further incremental update for the whole project
/// short-circuits until a full reindex succeeds. Shared between the
/// updater (which sets it) and the indexer (which clears it).
#[derive(Debug, Default)]
pub struct SyncGate {
    blocked: AtomicBool,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    pub fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }
}
