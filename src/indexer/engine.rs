//! Search engine boundary

use super::errors::IndexResult;
use super::schema::IndexSchema;
use super::walker::IndexDocument;

/// When a write becomes visible to searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Visible before the call returns
    Immediate,
    /// Visible after the engine's next periodic refresh
    Deferred,
}

/// Result of a per-id delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    NotFound,
}

/// Operations the synchronizer needs from a search engine
pub trait SearchEngine: Send + Sync {
    fn index_exists(&self, index: &str) -> IndexResult<bool>;

    /// Create an index; [`IndexError::AlreadyExists`] if it is already there
    ///
    /// [`IndexError::AlreadyExists`]: super::IndexError::AlreadyExists
    fn create_index(&self, schema: &IndexSchema) -> IndexResult<()>;

    /// Insert or replace a document under its id and routing key
    fn upsert(&self, index: &str, doc: &IndexDocument, refresh: Refresh) -> IndexResult<()>;

    /// Delete a document by id
    fn delete(&self, index: &str, id: &str, refresh: Refresh) -> IndexResult<DeleteStatus>;
}
