//! In-process store backend
//!
//! Keeps hashes and sets in one ordered map so prefix enumeration is a
//! range scan. Used by tests, the CLI demo, and embedders that do not need
//! an external backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::errors::{StoreError, StoreResult};
use super::KeyValueStore;

#[derive(Debug, Clone)]
enum Entry {
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

/// In-memory hash/set store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hash keys
    pub fn hash_count(&self) -> usize {
        self.read()
            .map(|data| data.values().filter(|e| matches!(e, Entry::Hash(_))).count())
            .unwrap_or(0)
    }

    /// Number of set keys
    pub fn set_count(&self) -> usize {
        self.read()
            .map(|data| data.values().filter(|e| matches!(e, Entry::Set(_))).count())
            .unwrap_or(0)
    }

    /// Every key currently stored
    pub fn keys(&self) -> Vec<String> {
        self.read()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.read().map(|data| data.is_empty()).unwrap_or(true)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.data.write().map_err(|_| StoreError::Poisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        match self.read()?.get(key) {
            None => Ok(BTreeMap::new()),
            Some(Entry::Hash(fields)) => Ok(fields.clone()),
            Some(Entry::Set(_)) => Err(wrong_type(key, "hash")),
        }
    }

    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        match self.read()?.get(key) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(Entry::Set(_)) => Err(wrong_type(key, "hash")),
        }
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut data = self.write()?;
        match data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()))
        {
            Entry::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Entry::Set(_) => Err(wrong_type(key, "hash")),
        }
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut data = self.write()?;
        match data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            Entry::Hash(_) => Err(wrong_type(key, "set")),
        }
    }

    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        match self.read()?.get(key) {
            None => Ok(BTreeSet::new()),
            Some(Entry::Set(members)) => Ok(members.clone()),
            Some(Entry::Hash(_)) => Err(wrong_type(key, "set")),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let data = self.read()?;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn hash_exists(&self, key: &str) -> StoreResult<bool> {
        Ok(matches!(self.read()?.get(key), Some(Entry::Hash(fields)) if !fields.is_empty()))
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}
