//! Operational counters
//!
//! Counters only, monotonic, reset on process start. Relaxed atomics:
//! readers may observe a slightly stale value.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of every counter the crate maintains
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    plans_created: AtomicU64,
    plans_updated: AtomicU64,
    plans_patched: AtomicU64,
    plans_deleted: AtomicU64,
    precondition_failures: AtomicU64,
    notifications_published: AtomicU64,
    notifications_dropped: AtomicU64,
    index_saves: AtomicU64,
    index_deletes: AtomicU64,
    index_failures: AtomicU64,
    redeliveries: AtomicU64,
    dead_letters: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Primary store

    pub fn increment_plans_created(&self) {
        self.plans_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_updated(&self) {
        self.plans_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_patched(&self) {
        self.plans_patched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_deleted(&self) {
        self.plans_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_precondition_failures(&self) {
        self.precondition_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Channel

    pub fn increment_notifications_published(&self) {
        self.notifications_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notifications_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Index synchronization

    pub fn increment_index_saves(&self) {
        self.index_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_deletes(&self) {
        self.index_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_failures(&self) {
        self.index_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_redeliveries(&self) {
        self.redeliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dead_letters(&self) {
        self.dead_letters.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_created: self.plans_created.load(Ordering::Relaxed),
            plans_updated: self.plans_updated.load(Ordering::Relaxed),
            plans_patched: self.plans_patched.load(Ordering::Relaxed),
            plans_deleted: self.plans_deleted.load(Ordering::Relaxed),
            precondition_failures: self.precondition_failures.load(Ordering::Relaxed),
            notifications_published: self.notifications_published.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
            index_saves: self.index_saves.load(Ordering::Relaxed),
            index_deletes: self.index_deletes.load(Ordering::Relaxed),
            index_failures: self.index_failures.load(Ordering::Relaxed),
            redeliveries: self.redeliveries.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_created: u64,
    pub plans_updated: u64,
    pub plans_patched: u64,
    pub plans_deleted: u64,
    pub precondition_failures: u64,
    pub notifications_published: u64,
    pub notifications_dropped: u64,
    pub index_saves: u64,
    pub index_deletes: u64,
    pub index_failures: u64,
    pub redeliveries: u64,
    pub dead_letters: u64,
}
