//! Handle table diagnostics.
//!
//! Counters are written only by the owning [`HandleTable`] and read by the
//! collector's scheduler and by operational tooling, possibly from other
//! threads. They never feed back into allocation.
//!
//! [`HandleTable`]: crate::HandleTable

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

/// Live counters shared with the collector.
///
/// # Example
///
/// ```
/// use handle_table::HandleDiagnostics;
///
/// let diagnostics = HandleDiagnostics::new();
/// assert_eq!(diagnostics.objects(), 0);
/// assert_eq!(diagnostics.collections(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HandleDiagnostics {
    collections: CachePadded<AtomicUsize>,
    objects: CachePadded<AtomicUsize>,
    bytes: CachePadded<AtomicUsize>,
}

impl HandleDiagnostics {
    /// Create a set of counters, all zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            collections: CachePadded::new(AtomicUsize::new(0)),
            objects: CachePadded::new(AtomicUsize::new(0)),
            bytes: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times table growth requested a full collection.
    #[inline]
    #[must_use]
    pub fn collections(&self) -> usize {
        self.collections.load(Ordering::Relaxed)
    }

    /// Live handles as of the most recent sweep.
    #[inline]
    #[must_use]
    pub fn objects(&self) -> usize {
        self.objects.load(Ordering::Relaxed)
    }

    /// Bytes of slot storage in use as of the most recent sweep.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Copy all counters at once.
    #[must_use]
    pub fn snapshot(&self) -> HandleMetrics {
        HandleMetrics {
            collections: self.collections(),
            objects: self.objects(),
            bytes: self.bytes(),
        }
    }

    /// Returns the new trigger count.
    pub(crate) fn record_collection_request(&self) -> usize {
        self.collections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_sweep(&self, objects: usize, bytes: usize) {
        self.objects.store(objects, Ordering::Relaxed);
        self.bytes.store(bytes, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`HandleDiagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleMetrics {
    /// Growth-triggered collection requests.
    pub collections: usize,
    /// Live handles as of the last sweep.
    pub objects: usize,
    /// Bytes in use as of the last sweep.
    pub bytes: usize,
}

/// Outcome of one pruning sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Handles still in use after the sweep.
    pub kept: usize,
    /// Weak handles cleared because their object was not marked.
    pub reclaimed: usize,
    /// Weak handles kept without a liveness check during a young collection.
    pub young_weak_retained: usize,
    /// Entries dropped from the caller's handle cache.
    pub cache_pruned: usize,
}
