use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Runtime metrics for a shared or replayable buffer.
///
/// A lightweight, read-only view exposing the number of live cursors.
/// Obtain a `Stats` handle via the buffer's `stats()` method. Values use
/// relaxed atomics and are intended for diagnostics.
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
#[derive(Debug, Clone)]
pub struct Stats {
    active_cursors: Arc<AtomicU64>,
}

impl Stats {
    // Create a new, empty stats instance.
    pub(crate) fn new() -> Self {
        Self {
            active_cursors: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn increment(&self) {
        self.active_cursors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decrement(&self) {
        self.active_cursors.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the number of live cursors for the associated buffer.
    ///
    /// Cursors are counted from creation (or clone) until drop; a value of
    /// `0` means no consumer currently holds a cursor.
    pub fn active_cursors(&self) -> u64 {
        self.active_cursors.load(Ordering::Relaxed)
    }
}
