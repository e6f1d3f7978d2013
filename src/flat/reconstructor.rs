//! Flat records → document, and cascading delete
//!
//! A reference set with more than one member, or whose field is a declared
//! collection, reads back as an array. A single-member set reads back as a
//! nested object.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::{decode_array_fields, decode_attribute, decode_scalar_array, ARRAY_FIELDS, ETAG_FIELD};
use crate::observability::{log_event, Event};
use crate::store::{KeyValueStore, StoreError};

use super::{FlatError, FlatOptions, FlatResult};

/// What a cascading delete removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Hash records removed
    pub records_removed: usize,
    /// Reference sets removed
    pub reference_sets_removed: usize,
}

/// Rebuild the document stored under `key`.
///
/// Fails with [`FlatError::NotFound`] when no record exists. The reserved
/// `eTag` attribute of the record at `key` is not part of the result.
pub fn reconstruct(store: &dyn KeyValueStore, key: &str, options: &FlatOptions) -> FlatResult<Value> {
    let mut path = Vec::new();
    match read_node(store, key, options, &mut path)? {
        Some(node) => Ok(Value::Object(node)),
        None => Err(FlatError::NotFound(key.to_string())),
    }
}

fn read_node(
    store: &dyn KeyValueStore,
    key: &str,
    options: &FlatOptions,
    path: &mut Vec<String>,
) -> FlatResult<Option<Map<String, Value>>> {
    let record = store.hash_get_all(key)?;
    if record.is_empty() {
        return Ok(None);
    }
    if path.len() > options.max_depth {
        return Err(FlatError::TooDeep {
            key: key.to_string(),
            max_depth: options.max_depth,
        });
    }

    let arrays = record
        .get(ARRAY_FIELDS)
        .map(|text| decode_array_fields(text))
        .unwrap_or_default();
    let is_root = path.is_empty();

    let mut node = Map::new();
    for (attr, text) in &record {
        if attr == ARRAY_FIELDS || (is_root && attr == ETAG_FIELD) {
            continue;
        }
        let value = if arrays.contains(attr) {
            decode_scalar_array(text)
        } else {
            decode_attribute(text)
        };
        node.insert(attr.clone(), value);
    }

    path.push(key.to_string());
    for (_, field, members) in reference_sets(store, key)? {
        if members.is_empty() {
            continue;
        }
        let as_array = members.len() > 1 || options.is_collection(&field);

        let mut children = Vec::with_capacity(members.len());
        for member in &members {
            if path.iter().any(|k| k == member) {
                return Err(FlatError::Cycle(member.clone()));
            }
            match read_node(store, member, options, path)? {
                Some(child) => children.push(Value::Object(child)),
                None => log_event(
                    Event::DanglingReference,
                    &[("key", key), ("field", field.as_str()), ("member", member.as_str())],
                ),
            }
        }

        if as_array {
            node.insert(field, Value::Array(children));
        } else if let Some(child) = children.pop() {
            node.insert(field, child);
        }
    }
    path.pop();

    Ok(Some(node))
}

/// Reference sets of `key` as (set key, field, members).
///
/// Keys under the prefix that hold a hash belong to another object whose id
/// merely extends this one and are skipped.
fn reference_sets(store: &dyn KeyValueStore, key: &str) -> FlatResult<Vec<(String, String, BTreeSet<String>)>> {
    let prefix = format!("{}:", key);
    let mut sets = Vec::new();
    for ref_key in store.keys_with_prefix(&prefix)? {
        let field = ref_key[prefix.len()..].to_string();
        if field.is_empty() || field.contains(':') {
            continue;
        }
        match store.set_members(&ref_key) {
            Ok(members) => sets.push((ref_key, field, members)),
            Err(StoreError::WrongType { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(sets)
}

/// Remove `key`, every record it transitively references, and every
/// reference set on the way. Children go before their parent.
///
/// Deleting a key that holds nothing is a no-op.
pub fn cascade_delete(store: &dyn KeyValueStore, key: &str, options: &FlatOptions) -> FlatResult<DeleteReport> {
    let mut report = DeleteReport::default();
    let mut visited = BTreeSet::new();
    // (key, depth, children already scheduled)
    let mut stack: Vec<(String, usize, bool)> = vec![(key.to_string(), 0, false)];

    while let Some((current, depth, expanded)) = stack.pop() {
        if expanded {
            for (ref_key, _, _) in reference_sets(store, &current)? {
                if store.delete(&ref_key)? {
                    report.reference_sets_removed += 1;
                }
            }
            if store.delete(&current)? {
                report.records_removed += 1;
            }
            continue;
        }

        if !visited.insert(current.clone()) {
            continue;
        }
        if depth > options.max_depth {
            return Err(FlatError::TooDeep {
                key: current,
                max_depth: options.max_depth,
            });
        }

        stack.push((current.clone(), depth, true));
        for (_, _, members) in reference_sets(store, &current)? {
            for member in members {
                if !visited.contains(&member) {
                    stack.push((member, depth + 1, false));
                }
            }
        }
    }

    Ok(report)
}
