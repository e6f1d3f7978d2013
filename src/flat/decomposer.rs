//! Document → flat records
//!
//! Decomposition is split in two: [`decompose`] validates the whole tree
//! and produces an in-memory [`Decomposition`], then
//! [`Decomposition::apply`] writes it. A malformed document therefore
//! never leaves partial writes behind.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::document::{
    check_field_name, classify, encode_array_fields, encode_scalar, encode_scalar_array,
    DocumentError, DocumentResult, FieldKind, ObjectKey, ARRAY_FIELDS,
};
use crate::store::{KeyValueStore, StoreResult};

/// Flat records and reference sets derived from one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    root: ObjectKey,
    records: BTreeMap<String, BTreeMap<String, String>>,
    references: BTreeMap<String, BTreeSet<String>>,
}

impl Decomposition {
    /// Key of the document root
    pub fn root(&self) -> &ObjectKey {
        &self.root
    }

    /// Hash records by key
    pub fn records(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.records
    }

    /// Reference sets by key
    pub fn references(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.references
    }

    /// Number of distinct object nodes
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of reference sets
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Write every record and reference set.
    ///
    /// Writing over existing keys is idempotent per field (last write wins).
    pub fn apply(&self, store: &dyn KeyValueStore) -> StoreResult<()> {
        for (key, fields) in &self.records {
            for (field, value) in fields {
                store.hash_set(key, field, value)?;
            }
        }
        for (key, members) in &self.references {
            for member in members {
                store.set_add(key, member)?;
            }
        }
        Ok(())
    }

    /// JSON view used by the CLI
    pub fn to_json(&self) -> Value {
        json!({
            "root": self.root.to_string(),
            "records": self.records,
            "references": self.references,
        })
    }
}

struct Frame<'a> {
    node: &'a Map<String, Value>,
    key: ObjectKey,
    depth: usize,
    path: String,
}

/// Flatten a document into records and reference sets.
///
/// Every nested object must carry its own `objectId`/`objectType`. Nodes
/// deeper than `max_depth` are rejected, as are nested field names that
/// cannot form a reference-set key. Fields holding scalar arrays are named
/// in the record's [`ARRAY_FIELDS`] attribute.
pub fn decompose(doc: &Value, max_depth: usize) -> DocumentResult<Decomposition> {
    let root_path = "$".to_string();
    let root = doc.as_object().ok_or_else(|| DocumentError::NotAnObject {
        path: root_path.clone(),
    })?;
    let root_key = ObjectKey::of(root, &root_path)?;

    let mut records: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut array_fields: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut stack = vec![Frame {
        node: root,
        key: root_key.clone(),
        depth: 0,
        path: root_path,
    }];

    while let Some(frame) = stack.pop() {
        let mut children: Vec<(String, &Map<String, Value>, String)> = Vec::new();
        let record_key = frame.key.to_string();
        let record = records.entry(record_key.clone()).or_default();

        for (field, value) in frame.node {
            let path = format!("{}.{}", frame.path, field);
            let kind = classify(value, &path)?;
            check_field_name(field, &kind, &path)?;
            match kind {
                FieldKind::Scalar(scalar) => {
                    record.insert(field.clone(), encode_scalar(scalar));
                }
                FieldKind::ScalarArray(items) => {
                    record.insert(field.clone(), encode_scalar_array(items));
                    array_fields
                        .entry(record_key.clone())
                        .or_default()
                        .insert(field.clone());
                }
                FieldKind::Object(child) => {
                    children.push((field.clone(), child, path));
                }
                FieldKind::ObjectArray(items) => {
                    for (i, child) in items.into_iter().enumerate() {
                        children.push((field.clone(), child, format!("{}[{}]", path, i)));
                    }
                }
            }
        }

        for (field, child, path) in children {
            let depth = frame.depth + 1;
            if depth > max_depth {
                return Err(DocumentError::TooDeep { path, max_depth });
            }
            let child_key = ObjectKey::of(child, &path)?;
            references
                .entry(frame.key.reference_key(&field))
                .or_default()
                .insert(child_key.to_string());
            stack.push(Frame {
                node: child,
                key: child_key,
                depth,
                path,
            });
        }
    }

    for (key, fields) in &array_fields {
        if let Some(record) = records.get_mut(key) {
            record.insert(ARRAY_FIELDS.to_string(), encode_array_fields(fields));
        }
    }

    Ok(Decomposition {
        root: root_key,
        records,
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> Value {
        json!({
            "objectId": "p1",
            "objectType": "plan",
            "planType": "inNetwork",
            "planCostShares": {"objectId": "c1", "objectType": "membercostshare", "copay": 20},
            "linkedPlanServices": [
                {
                    "objectId": "s1",
                    "objectType": "planservice",
                    "linkedService": {"objectId": "l1", "objectType": "service", "name": "Yearly physical"},
                    "planserviceCostShares": {"objectId": "c2", "objectType": "membercostshare", "copay": 0}
                },
                {
                    "objectId": "s2",
                    "objectType": "planservice",
                    "linkedService": {"objectId": "l2", "objectType": "service", "name": "Well baby"}
                }
            ]
        })
    }

    #[test]
    fn test_root_record_holds_only_scalars() {
        let d = decompose(&sample(), 32).unwrap();
        let root = &d.records()["plan:p1"];
        assert_eq!(root.get("planType").map(String::as_str), Some("inNetwork"));
        assert!(!root.contains_key("planCostShares"));
        assert!(!root.contains_key("linkedPlanServices"));
    }

    #[test]
    fn test_counts() {
        let d = decompose(&sample(), 32).unwrap();
        // p1, c1, s1, l1, c2, s2, l2
        assert_eq!(d.record_count(), 7);
        // planCostShares, linkedPlanServices, s1.linkedService,
        // s1.planserviceCostShares, s2.linkedService
        assert_eq!(d.reference_count(), 5);
        assert_eq!(d.references()["plan:p1:linkedPlanServices"].len(), 2);
        assert_eq!(d.root().to_string(), "plan:p1");
    }

    #[test]
    fn test_nested_without_identity_is_rejected() {
        let doc = json!({
            "objectId": "p1",
            "objectType": "plan",
            "planCostShares": {"copay": 20}
        });
        let err = decompose(&doc, 32).unwrap_err();
        assert!(matches!(err, DocumentError::MissingIdentity { ref path, .. } if path == "$.planCostShares"));
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(matches!(
            decompose(&json!([1, 2]), 32),
            Err(DocumentError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_scalar_array_stored_as_one_attribute() {
        let doc = json!({"objectId": "p1", "objectType": "plan", "tags": ["a", "b"]});
        let d = decompose(&doc, 32).unwrap();
        assert_eq!(d.records()["plan:p1"]["tags"], r#"["a","b"]"#);
        assert_eq!(d.records()["plan:p1"][ARRAY_FIELDS], r#"["tags"]"#);
        assert_eq!(d.reference_count(), 0);
    }

    #[test]
    fn test_plain_record_has_no_array_attribute() {
        let d = decompose(&sample(), 32).unwrap();
        assert!(d.records().values().all(|r| !r.contains_key(ARRAY_FIELDS)));
    }

    #[test]
    fn test_nested_field_name_with_colon_rejected() {
        let doc = json!({
            "objectId": "p1",
            "objectType": "plan",
            "a:b": {"objectId": "c1", "objectType": "membercostshare", "copay": 5}
        });
        let err = decompose(&doc, 32).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidFieldName { ref field, .. } if field == "a:b"));

        // Scalar attributes may use any name
        let flat = json!({"objectId": "p1", "objectType": "plan", "a:b": 5});
        assert!(decompose(&flat, 32).is_ok());
    }

    #[test]
    fn test_reserved_attribute_name_rejected() {
        let doc = json!({"objectId": "p1", "objectType": "plan", "@arrays": "x"});
        assert!(matches!(
            decompose(&doc, 32),
            Err(DocumentError::InvalidFieldName { .. })
        ));
    }

    #[test]
    fn test_depth_bound() {
        let doc = json!({
            "objectId": "a", "objectType": "t",
            "child": {"objectId": "b", "objectType": "t",
                "child": {"objectId": "c", "objectType": "t"}}
        });
        assert!(decompose(&doc, 2).is_ok());
        assert!(matches!(
            decompose(&doc, 1),
            Err(DocumentError::TooDeep { max_depth: 1, .. })
        ));
    }

    #[test]
    fn test_apply_writes_everything() {
        let store = MemoryStore::new();
        let d = decompose(&sample(), 32).unwrap();
        d.apply(&store).unwrap();

        assert_eq!(store.hash_count(), 7);
        assert_eq!(store.set_count(), 5);
        assert_eq!(
            store.hash_get("membercostshare:c1", "copay").unwrap().as_deref(),
            Some("20")
        );
    }

    #[test]
    fn test_shared_child_last_write_wins() {
        let doc = json!({
            "objectId": "p1", "objectType": "plan",
            "a": {"objectId": "x", "objectType": "t", "v": "first"},
            "b": {"objectId": "x", "objectType": "t", "w": "second"}
        });
        let d = decompose(&doc, 32).unwrap();
        assert_eq!(d.record_count(), 2);
        let shared = &d.records()["t:x"];
        assert_eq!(shared.len(), 4);
    }
}
