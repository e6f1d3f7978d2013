//! Flat key-value store adapter
//!
//! The backend only knows two value shapes per key: a hash of
//! field → text, and a set of member strings. Documents are spread across
//! many such keys by the `flat` module.
//!
//! # Contract
//!
//! - Operations on one key are atomic; there are no multi-key transactions
//! - Using a hash operation on a set key (or the reverse) is an error
//! - Reading a missing key yields an empty hash or set, never an error

mod errors;
mod memory;

use std::collections::{BTreeMap, BTreeSet};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Store adapter consumed by the decomposer, reconstructor and plan service
pub trait KeyValueStore: Send + Sync {
    /// All field/value pairs of a hash key (empty if absent)
    fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    /// One field of a hash key
    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Set one field of a hash key, creating the key if needed
    fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Add a member to a set key, creating the key if needed
    fn set_add(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Members of a set key (empty if absent)
    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>>;

    /// Remove a key of any shape. Returns whether it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Every key starting with `prefix`, in lexicographic order
    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Whether a key of any shape exists
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Whether `key` holds a non-empty hash. A set key answers `false`.
    fn hash_exists(&self, key: &str) -> StoreResult<bool>;
}
