//! Search index synchronization
//!
//! Consumes `{operation, body}` notifications and maintains a flat search
//! index in which every plan node is its own document, tied to its parent
//! by the `plan_join` join field and routed by the parent's id.
//!
//! # Guarantees
//!
//! - Runs after the primary store commits and never writes to it
//! - SAVE and DELETE are idempotent; redelivery is safe
//! - Per-key ordering comes from the channel: one [`IndexWorker`] task per
//!   partition
//! - Engine failures are retried in place, then dead-lettered

mod engine;
mod errors;
mod memory;
mod schema;
mod synchronizer;
mod walker;
mod worker;

pub use engine::{DeleteStatus, Refresh, SearchEngine};
pub use errors::{IndexError, IndexResult};
pub use memory::MemorySearchEngine;
pub use schema::{FieldType, IndexSchema, DATE_FORMAT, JOIN_FIELD, ROOT_RELATION};
pub use synchronizer::{IndexSynchronizer, SyncReport};
pub use walker::{index_documents, index_ids, IndexDocument};
pub use worker::{IndexWorker, WorkerStats};
