//! Decomposition and reconstruction of plan documents
//!
//! A document tree is flattened into:
//!
//! - one hash per object node, keyed `objectType:objectId`, holding the
//!   node's scalar attributes
//! - one set per nested field, keyed `objectType:objectId:fieldName`,
//!   holding the keys of the child nodes realizing that field
//!
//! A hash never holds a nested value. Reconstruction walks the same
//! structure back; array order is not preserved because sets are unordered.
//!
//! There is no multi-key transaction. A crash in the middle of
//! [`Decomposition::apply`] or [`cascade_delete`] can leave a partial
//! subtree behind.

mod decomposer;
mod reconstructor;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::config::PlanStoreConfig;
use crate::document::DocumentError;
use crate::store::StoreError;

pub use decomposer::{decompose, Decomposition};
pub use reconstructor::{cascade_delete, reconstruct, DeleteReport};

/// Result type for flat storage operations
pub type FlatResult<T> = Result<T, FlatError>;

/// Errors from decomposition and reconstruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlatError {
    /// No record is stored under the key
    #[error("No record stored under '{0}'")]
    NotFound(String),

    /// Input document has an unsupported shape
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Stored references loop back onto a node already being read
    #[error("Reference cycle detected at '{0}'")]
    Cycle(String),

    /// Stored nesting is deeper than allowed
    #[error("Stored nesting under '{key}' exceeds the maximum depth of {max_depth}")]
    TooDeep { key: String, max_depth: usize },

    /// Backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Settings shared by the decomposer and reconstructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatOptions {
    /// Reference fields that always read back as arrays
    pub collection_fields: BTreeSet<String>,
    /// Maximum nesting depth (the root is depth 0)
    pub max_depth: usize,
}

impl FlatOptions {
    /// Build options from the crate configuration
    pub fn from_config(config: &PlanStoreConfig) -> Self {
        Self {
            collection_fields: config.collection_fields.iter().cloned().collect(),
            max_depth: config.max_depth,
        }
    }

    /// Whether `field` is declared as a collection
    pub fn is_collection(&self, field: &str) -> bool {
        self.collection_fields.contains(field)
    }
}

impl Default for FlatOptions {
    fn default() -> Self {
        Self::from_config(&PlanStoreConfig::default())
    }
}
