//! Document tree to index documents
//!
//! Walks the tree the same way the decomposer does and emits one
//! [`IndexDocument`] per node, parents before children. A node's relation
//! is the field name it hangs under; the root's relation is `plan`.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::document::{check_field_name, classify, DocumentError, DocumentResult, FieldKind, ObjectKey};

use super::schema::{JOIN_FIELD, ROOT_RELATION};

/// One node of a plan as sent to the search engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    /// The node's own `objectId`
    pub id: String,
    /// Routing key: the parent's id, `None` for the root
    pub routing: Option<String>,
    pub relation: String,
    pub parent: Option<String>,
    /// Scalar attributes plus the join descriptor
    pub source: Map<String, Value>,
}

impl IndexDocument {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

struct Frame<'a> {
    node: &'a Map<String, Value>,
    relation: String,
    parent: Option<String>,
    depth: usize,
    path: String,
}

/// Index documents for every node of `doc`, in pre-order
pub fn index_documents(doc: &Value, max_depth: usize) -> DocumentResult<Vec<IndexDocument>> {
    let root = doc.as_object().ok_or_else(|| DocumentError::NotAnObject {
        path: "$".to_string(),
    })?;

    let mut out = Vec::new();
    let mut stack = vec![Frame {
        node: root,
        relation: ROOT_RELATION.to_string(),
        parent: None,
        depth: 0,
        path: "$".to_string(),
    }];

    while let Some(frame) = stack.pop() {
        let id = ObjectKey::of(frame.node, &frame.path)?.object_id().to_string();
        let mut source = Map::new();
        let mut children = Vec::new();

        for (field, value) in frame.node {
            let path = format!("{}.{}", frame.path, field);
            let kind = classify(value, &path)?;
            check_field_name(field, &kind, &path)?;
            match kind {
                FieldKind::Scalar(_) | FieldKind::ScalarArray(_) => {
                    source.insert(field.clone(), value.clone());
                }
                FieldKind::Object(child) => children.push((field.clone(), child, path)),
                FieldKind::ObjectArray(items) => {
                    for (i, child) in items.into_iter().enumerate() {
                        children.push((field.clone(), child, format!("{}[{}]", path, i)));
                    }
                }
            }
        }

        let join = match &frame.parent {
            None => json!(frame.relation),
            Some(parent) => json!({ "name": frame.relation, "parent": parent }),
        };
        source.insert(JOIN_FIELD.to_string(), join);

        // Reversed so the stack pops children in document order
        for (field, child, path) in children.into_iter().rev() {
            let depth = frame.depth + 1;
            if depth > max_depth {
                return Err(DocumentError::TooDeep { path, max_depth });
            }
            stack.push(Frame {
                node: child,
                relation: field,
                parent: Some(id.clone()),
                depth,
                path,
            });
        }

        out.push(IndexDocument {
            routing: frame.parent.clone(),
            parent: frame.parent,
            relation: frame.relation,
            id,
            source,
        });
    }

    Ok(out)
}

/// Ids of every node of `doc`
pub fn index_ids(doc: &Value, max_depth: usize) -> DocumentResult<Vec<String>> {
    Ok(index_documents(doc, max_depth)?
        .into_iter()
        .map(|d| d.id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Value {
        json!({
            "objectId": "p1",
            "objectType": "plan",
            "planType": "inNetwork",
            "planCostShares": {"objectId": "c1", "objectType": "membercostshare", "copay": 20},
            "linkedPlanServices": [{
                "objectId": "s1",
                "objectType": "planservice",
                "linkedService": {"objectId": "l1", "objectType": "service", "name": "Yearly physical"}
            }]
        })
    }

    #[test]
    fn test_one_document_per_node() {
        let docs = index_documents(&plan(), 32).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], "p1");
        assert!(ids.contains(&"c1") && ids.contains(&"s1") && ids.contains(&"l1"));
    }

    #[test]
    fn test_join_descriptors() {
        let docs = index_documents(&plan(), 32).unwrap();
        let root = &docs[0];
        assert!(root.is_root());
        assert_eq!(root.routing, None);
        assert_eq!(root.source["plan_join"], "plan");
        assert!(!root.source.contains_key("planCostShares"));

        let service = docs.iter().find(|d| d.id == "l1").unwrap();
        assert_eq!(service.relation, "linkedService");
        assert_eq!(service.routing.as_deref(), Some("s1"));
        assert_eq!(
            service.source["plan_join"],
            json!({"name": "linkedService", "parent": "s1"})
        );
    }

    #[test]
    fn test_parents_before_children() {
        let docs = index_documents(&plan(), 32).unwrap();
        let pos = |id: &str| docs.iter().position(|d| d.id == id).unwrap();
        assert!(pos("p1") < pos("s1"));
        assert!(pos("s1") < pos("l1"));
    }

    #[test]
    fn test_scalar_values_kept_typed() {
        let docs = index_documents(&plan(), 32).unwrap();
        let cost = docs.iter().find(|d| d.id == "c1").unwrap();
        assert_eq!(cost.source["copay"], json!(20));
    }

    #[test]
    fn test_unkeyable_relation_rejected() {
        let doc = json!({
            "objectId": "p1",
            "objectType": "plan",
            "a:b": {"objectId": "c1", "objectType": "membercostshare"}
        });
        assert!(matches!(
            index_documents(&doc, 32),
            Err(DocumentError::InvalidFieldName { .. })
        ));
    }

    #[test]
    fn test_ids_and_depth() {
        assert_eq!(index_ids(&plan(), 32).unwrap().len(), 4);
        assert!(matches!(
            index_documents(&plan(), 1),
            Err(DocumentError::TooDeep { .. })
        ));
    }
}
