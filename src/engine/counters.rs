//! Shared outcome counters, incremented by workers without locking.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::Counters;

/// Five independent monotonic counters. Each is only ever added to.
#[derive(Debug, Default)]
pub struct CounterAggregate {
    indexed: AtomicU64,
    unindexable: AtomicU64,
    empty: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl CounterAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&self, n: u64) {
        self.indexed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_unindexable(&self) {
        self.unindexable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_empty(&self) {
        self.empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_skipped(&self, n: u64) {
        self.skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn indexed(&self) -> u64 {
        self.indexed.load(Ordering::Relaxed)
    }

    /// Point-in-time read of all five. Only exact once every worker has joined.
    pub fn snapshot(&self) -> Counters {
        Counters {
            indexed: self.indexed.load(Ordering::Relaxed),
            unindexable: self.unindexable.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
