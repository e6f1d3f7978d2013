//! Merge-patch of a stored document
//!
//! - objects merge field by field, recursively
//! - arrays of objects merge element-wise by `objectId`; unmatched patch
//!   elements are appended
//! - everything else (scalars, scalar arrays, shape changes) is replaced

use serde_json::{Map, Value};

use crate::document::OBJECT_ID;

/// Apply `patch` onto `base` in place
pub fn merge_patch(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => merge_objects(base_map, patch_map),
        (base, patch) => *base = patch.clone(),
    }
}

fn merge_objects(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (field, patch_value) in patch {
        match base.get_mut(field) {
            Some(existing) => merge_field(existing, patch_value),
            None => {
                base.insert(field.clone(), patch_value.clone());
            }
        }
    }
}

fn merge_field(existing: &mut Value, patch: &Value) {
    match (existing, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => merge_objects(base_map, patch_map),
        (Value::Array(base_items), Value::Array(patch_items))
            if all_objects(base_items) && all_objects(patch_items) && !patch_items.is_empty() =>
        {
            merge_object_arrays(base_items, patch_items)
        }
        (existing, patch) => *existing = patch.clone(),
    }
}

fn merge_object_arrays(base: &mut Vec<Value>, patch: &[Value]) {
    for element in patch {
        let id = element.get(OBJECT_ID);
        let matched = id.and_then(|id| base.iter_mut().find(|b| b.get(OBJECT_ID) == Some(id)));
        match matched {
            Some(existing) => merge_patch(existing, element),
            None => base.push(element.clone()),
        }
    }
}

fn all_objects(items: &[Value]) -> bool {
    items.iter().all(Value::is_object)
}
