//! Database statistics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of database activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Completed entries (values and cached failures)
    pub cached: usize,
    /// Resolutions in flight
    pub pending: usize,
    /// Builds answered from a completed entry
    pub hits: u64,
    /// Builds that started a resolution
    pub misses: u64,
    /// Builds that joined a resolution already in flight
    pub joins: u64,
    /// Resolutions that failed
    pub failures: u64,
    /// Waits refused because they would close a dependency cycle
    pub cycles: u64,
    /// Waits abandoned because the caller was canceled
    pub cancellations: u64,
    /// Stored blobs
    pub blob_count: usize,
    /// Bytes held by stored blobs
    pub blob_bytes: u64,
    /// Registered captures
    pub capture_count: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    failures: AtomicU64,
    cycles: AtomicU64,
    cancellations: AtomicU64,
}

impl Counters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into `stats`
    pub(crate) fn fill(&self, stats: &mut DatabaseStats) {
        stats.hits = self.hits.load(Ordering::Relaxed);
        stats.misses = self.misses.load(Ordering::Relaxed);
        stats.joins = self.joins.load(Ordering::Relaxed);
        stats.failures = self.failures.load(Ordering::Relaxed);
        stats.cycles = self.cycles.load(Ordering::Relaxed);
        stats.cancellations = self.cancellations.load(Ordering::Relaxed);
    }
}
