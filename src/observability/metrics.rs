//! Operation counters
//!
//! Monotonic counters only, reset on process start. Increments are atomic
//! with relaxed ordering; metrics tolerate being a moment stale.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for every ledger operation outcome.
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    allocations_created: AtomicU64,
    allocations_updated: AtomicU64,
    allocations_closed: AtomicU64,
    allocations_deleted: AtomicU64,
    usage_recorded: AtomicU64,
    usage_rejected: AtomicU64,
    usage_deleted: AtomicU64,
    stats_computed: AtomicU64,
    write_conflicts: AtomicU64,
}

impl LedgerMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_allocations_created(&self) {
        self.allocations_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_allocations_updated(&self) {
        self.allocations_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_allocations_closed(&self) {
        self.allocations_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_allocations_deleted(&self) {
        self.allocations_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_usage_recorded(&self) {
        self.usage_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// A usage write rejected for insufficient funds or a blocking status.
    pub fn increment_usage_rejected(&self) {
        self.usage_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_usage_deleted(&self) {
        self.usage_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_computed(&self) {
        self.stats_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// A write that exhausted its lock retry budget.
    pub fn increment_write_conflicts(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allocations_created: self.allocations_created.load(Ordering::Relaxed),
            allocations_updated: self.allocations_updated.load(Ordering::Relaxed),
            allocations_closed: self.allocations_closed.load(Ordering::Relaxed),
            allocations_deleted: self.allocations_deleted.load(Ordering::Relaxed),
            usage_recorded: self.usage_recorded.load(Ordering::Relaxed),
            usage_rejected: self.usage_rejected.load(Ordering::Relaxed),
            usage_deleted: self.usage_deleted.load(Ordering::Relaxed),
            stats_computed: self.stats_computed.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub allocations_created: u64,
    pub allocations_updated: u64,
    pub allocations_closed: u64,
    pub allocations_deleted: u64,
    pub usage_recorded: u64,
    pub usage_rejected: u64,
    pub usage_deleted: u64,
    pub stats_computed: u64,
    pub write_conflicts: u64,
}
