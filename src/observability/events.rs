//! Observable events
//!
//! Every log line emitted by the crate names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded from disk
    ConfigLoaded,

    // Primary store mutations
    /// Plan created
    PlanCreate,
    /// Plan replaced
    PlanUpdate,
    /// Plan merge-patched
    PlanPatch,
    /// Plan cascade-deleted
    PlanDelete,
    /// Conditional mutation rejected on a stale token
    PreconditionFailed,

    // Reconstruction
    /// A reference set names a record that no longer exists
    DanglingReference,

    // Notification channel
    /// Change notification sent
    NotificationPublished,
    /// Change notification could not be sent
    NotificationDropped,

    // Index synchronization
    /// Search index created with the join schema
    IndexCreated,
    /// Document tree upserted into the index
    IndexSave,
    /// Document tree removed from the index
    IndexDelete,
    /// Index delete of an id that was not indexed
    IndexDeleteMissing,
    /// Notification handling failed and will be retried
    IndexRedelivery,
    /// Notification abandoned after exhausting redeliveries
    IndexDeadLetter,
    /// Partition consumer started
    WorkerStarted,
    /// Partition consumer drained and stopped
    WorkerStopped,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::PlanCreate => "PLAN_CREATE",
            Event::PlanUpdate => "PLAN_UPDATE",
            Event::PlanPatch => "PLAN_PATCH",
            Event::PlanDelete => "PLAN_DELETE",
            Event::PreconditionFailed => "PLAN_PRECONDITION_FAILED",
            Event::DanglingReference => "DANGLING_REFERENCE",
            Event::NotificationPublished => "NOTIFICATION_PUBLISHED",
            Event::NotificationDropped => "NOTIFICATION_DROPPED",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexSave => "INDEX_SAVE",
            Event::IndexDelete => "INDEX_DELETE",
            Event::IndexDeleteMissing => "INDEX_DELETE_MISSING",
            Event::IndexRedelivery => "INDEX_REDELIVERY",
            Event::IndexDeadLetter => "INDEX_DEAD_LETTER",
            Event::WorkerStarted => "WORKER_STARTED",
            Event::WorkerStopped => "WORKER_STOPPED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::IndexDeleteMissing => Severity::Trace,
            Event::PreconditionFailed
            | Event::DanglingReference
            | Event::IndexRedelivery => Severity::Warn,
            Event::NotificationDropped | Event::IndexDeadLetter => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
