//! In-memory search engine
//!
//! Enforces the parts of the mapping a real engine would reject on:
//! - the join relation must be declared, with a parent exactly when it is
//!   not the root relation
//! - `long` properties must hold integers (numeric strings are coerced)
//! - `date` properties must parse as `MM-dd-yyyy`
//!
//! Deferred writes stay invisible until [`MemorySearchEngine::refresh`].

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde_json::Value;

use super::engine::{DeleteStatus, Refresh, SearchEngine};
use super::errors::{IndexError, IndexResult};
use super::schema::{FieldType, IndexSchema, JOIN_FIELD, ROOT_RELATION};
use super::walker::IndexDocument;

/// `%m-%d-%Y`, the chrono spelling of the mapped date format
const CHRONO_DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug)]
struct MemoryIndex {
    schema: IndexSchema,
    visible: BTreeMap<String, IndexDocument>,
    /// `None` marks a pending delete
    pending: BTreeMap<String, Option<IndexDocument>>,
}

impl MemoryIndex {
    fn current(&self, id: &str) -> Option<&IndexDocument> {
        match self.pending.get(id) {
            Some(pending) => pending.as_ref(),
            None => self.visible.get(id),
        }
    }

    fn refresh(&mut self) {
        for (id, doc) in std::mem::take(&mut self.pending) {
            match doc {
                Some(doc) => {
                    self.visible.insert(id, doc);
                }
                None => {
                    self.visible.remove(&id);
                }
            }
        }
    }

    fn validate(&self, doc: &IndexDocument) -> IndexResult<()> {
        if doc.id.is_empty() {
            return Err(IndexError::mapping("", "empty document id"));
        }
        if !self.schema.declares(&doc.relation) {
            return Err(IndexError::mapping(
                &doc.id,
                format!("relation '{}' is not declared in '{}'", doc.relation, JOIN_FIELD),
            ));
        }
        let is_root = doc.relation == ROOT_RELATION;
        if is_root != doc.parent.is_none() {
            return Err(IndexError::mapping(
                &doc.id,
                format!("relation '{}' has the wrong parent", doc.relation),
            ));
        }
        if doc.parent.is_some() && doc.routing.is_none() {
            return Err(IndexError::mapping(&doc.id, "child document without routing"));
        }
        if !doc.source.contains_key(JOIN_FIELD) {
            return Err(IndexError::mapping(&doc.id, "missing join field"));
        }

        for (field, value) in &doc.source {
            match self.schema.field_type(field) {
                Some(FieldType::Long) if !is_integer(value) => {
                    return Err(IndexError::mapping(
                        &doc.id,
                        format!("'{}' is not an integer: {}", field, value),
                    ));
                }
                Some(FieldType::Date) if !is_date(value) => {
                    return Err(IndexError::mapping(
                        &doc.id,
                        format!("'{}' is not a {} date: {}", field, CHRONO_DATE_FORMAT, value),
                    ));
                }
                Some(FieldType::Keyword | FieldType::Text) if value.is_object() => {
                    return Err(IndexError::mapping(
                        &doc.id,
                        format!("'{}' is mapped as a string", field),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| NaiveDate::parse_from_str(s, CHRONO_DATE_FORMAT).is_ok())
        .unwrap_or(false)
}

/// Search engine held in process memory
#[derive(Debug, Default)]
pub struct MemorySearchEngine {
    indexes: RwLock<BTreeMap<String, MemoryIndex>>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deferred writes on `index` visible
    pub fn refresh(&self, index: &str) -> IndexResult<()> {
        let mut indexes = self.write()?;
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))?;
        idx.refresh();
        Ok(())
    }

    /// Visible document by id
    pub fn get(&self, index: &str, id: &str) -> IndexResult<Option<IndexDocument>> {
        let indexes = self.read()?;
        let idx = indexes
            .get(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))?;
        Ok(idx.visible.get(id).cloned())
    }

    /// Number of visible documents; zero for a missing index
    pub fn document_count(&self, index: &str) -> usize {
        self.read()
            .map(|indexes| indexes.get(index).map(|i| i.visible.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Visible children of `parent_id`, ordered by id
    pub fn children_of(&self, index: &str, parent_id: &str) -> IndexResult<Vec<IndexDocument>> {
        let indexes = self.read()?;
        let idx = indexes
            .get(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))?;
        Ok(idx
            .visible
            .values()
            .filter(|d| d.parent.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    /// Schema an index was created with
    pub fn schema(&self, index: &str) -> Option<IndexSchema> {
        self.read()
            .ok()
            .and_then(|indexes| indexes.get(index).map(|i| i.schema.clone()))
    }

    fn read(
        &self,
    ) -> IndexResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, MemoryIndex>>> {
        self.indexes
            .read()
            .map_err(|_| IndexError::Engine("index lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> IndexResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, MemoryIndex>>> {
        self.indexes
            .write()
            .map_err(|_| IndexError::Engine("index lock poisoned".to_string()))
    }
}

impl SearchEngine for MemorySearchEngine {
    fn index_exists(&self, index: &str) -> IndexResult<bool> {
        Ok(self.read()?.contains_key(index))
    }

    fn create_index(&self, schema: &IndexSchema) -> IndexResult<()> {
        let mut indexes = self.write()?;
        if indexes.contains_key(schema.name()) {
            return Err(IndexError::AlreadyExists(schema.name().to_string()));
        }
        indexes.insert(
            schema.name().to_string(),
            MemoryIndex {
                schema: schema.clone(),
                visible: BTreeMap::new(),
                pending: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn upsert(&self, index: &str, doc: &IndexDocument, refresh: Refresh) -> IndexResult<()> {
        let mut indexes = self.write()?;
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))?;
        idx.validate(doc)?;
        idx.pending.insert(doc.id.clone(), Some(doc.clone()));
        if refresh == Refresh::Immediate {
            idx.refresh();
        }
        Ok(())
    }

    fn delete(&self, index: &str, id: &str, refresh: Refresh) -> IndexResult<DeleteStatus> {
        let mut indexes = self.write()?;
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| IndexError::IndexMissing(index.to_string()))?;
        if idx.current(id).is_none() {
            return Ok(DeleteStatus::NotFound);
        }
        idx.pending.insert(id.to_string(), None);
        if refresh == Refresh::Immediate {
            idx.refresh();
        }
        Ok(DeleteStatus::Deleted)
    }
}
