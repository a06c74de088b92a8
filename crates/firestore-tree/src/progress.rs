//! Progress callbacks for long-running walks.
//!
//! Reporting never affects what is exported or restored.

/// Receives progress events from the export and restore walkers.
pub trait Progress {
    /// A collection walk is starting.
    fn collection_started(&self, _path: &str) {}

    /// A document was exported, or its write was queued.
    fn document_done(&self, _collection_path: &str) {}

    /// A batch of writes was committed.
    fn batch_committed(&self, _collection_path: &str, _writes: usize) {}
}

/// Discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}
