//! Per-path debounce table with cancel-and-replace semantics.
//!
//! Rapid saves of the same file collapse into one unit of work: each
//! new event replaces the path's deadline, so only the latest state
//! within the quiet window is ever synced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct DebounceTable {
    deadlines: HashMap<PathBuf, Instant>,
    quiet: Duration,
}

impl DebounceTable {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            deadlines: HashMap::new(),
            quiet: Duration::from_millis(quiet_ms),
        }
    }

    /// Schedule (or reschedule) a path. A pending deadline for the same
    /// path is replaced, never queued behind.
    pub fn schedule(&mut self, path: PathBuf) {
        self.deadlines.insert(path, Instant::now() + self.quiet);
    }

    /// Drop a pending entry, e.g. when the file was deleted before its
    /// deadline fired.
    pub fn cancel(&mut self, path: &Path) {
        self.deadlines.remove(path);
    }

    /// Remove and return every path whose quiet period has elapsed.
    pub fn take_due(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut due = Vec::new();
        self.deadlines.retain(|path, deadline| {
            if *deadline <= now {
                due.push(path.clone());
                false
            } else {
                true
            }
        });
        due
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_fires_after_quiet_period() {
        let mut table = DebounceTable::new(40);
        table.schedule(PathBuf::from("a.py"));

        assert!(table.take_due().is_empty());
        sleep(Duration::from_millis(50));

        let due = table.take_due();
        assert_eq!(due, vec![PathBuf::from("a.py")]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let mut table = DebounceTable::new(40);
        table.schedule(PathBuf::from("a.py"));
        sleep(Duration::from_millis(25));

        // Second event restarts the clock
        table.schedule(PathBuf::from("a.py"));
        sleep(Duration::from_millis(25));
        assert!(table.take_due().is_empty());

        sleep(Duration::from_millis(25));
        assert_eq!(table.take_due().len(), 1);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut table = DebounceTable::new(40);
        table.schedule(PathBuf::from("a.py"));
        table.cancel(Path::new("a.py"));
        sleep(Duration::from_millis(50));
        assert!(table.take_due().is_empty());
    }

    #[test]
    fn test_paths_fire_independently() {
        let mut table = DebounceTable::new(40);
        table.schedule(PathBuf::from("a.py"));
        sleep(Duration::from_millis(25));
        table.schedule(PathBuf::from("b.py"));
        sleep(Duration::from_millis(20));

        let due = table.take_due();
        assert_eq!(due, vec![PathBuf::from("a.py")]);
        assert_eq!(table.pending(), 1);
    }
}
