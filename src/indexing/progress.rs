//! Progress reporting for long-running scans.
//!
//! The indexer reports through a trait object instead of calling into
//! any host UI directly; the CLI hangs an indicatif bar off this, tests
//! use [`NullProgress`].

/// Receives `(processed, total, message)` after each batch.
pub trait ProgressSink: Send + Sync {
    fn report(&self, processed: usize, total: usize, message: &str);
}

/// Discards all progress reports.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _processed: usize, _total: usize, _message: &str) {}
}

/// Forwards progress to the tracing subscriber.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, processed: usize, total: usize, message: &str) {
        tracing::info!(target: "indexer", "{processed}/{total} {message}");
    }
}
