//! Field classification and the attribute text codec

use std::collections::BTreeSet;

use serde_json::{Map, Number, Value};

use super::errors::{DocumentError, DocumentResult};

/// Reserved record attribute listing the fields stored as scalar arrays
pub const ARRAY_FIELDS: &str = "@arrays";

/// Shape of a single field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind<'a> {
    /// String, number, boolean or null
    Scalar(&'a Value),
    /// Nested object, stored under its own key
    Object(&'a Map<String, Value>),
    /// Array whose elements are all objects
    ObjectArray(Vec<&'a Map<String, Value>>),
    /// Array of bare scalars (possibly empty), stored as one opaque attribute
    ScalarArray(&'a [Value]),
}

/// Classify a field value.
///
/// Arrays mixing objects with scalars, and arrays containing arrays, are
/// rejected rather than partially stored.
pub fn classify<'a>(value: &'a Value, path: &str) -> DocumentResult<FieldKind<'a>> {
    match value {
        Value::Object(map) => Ok(FieldKind::Object(map)),
        Value::Array(items) => classify_array(items, path),
        scalar => Ok(FieldKind::Scalar(scalar)),
    }
}

fn classify_array<'a>(items: &'a [Value], path: &str) -> DocumentResult<FieldKind<'a>> {
    if items.iter().any(Value::is_array) {
        return Err(DocumentError::UnsupportedArray {
            path: path.to_string(),
            reason: "nested arrays are not supported".to_string(),
        });
    }

    let objects: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
    if objects.is_empty() {
        return Ok(FieldKind::ScalarArray(items));
    }
    if objects.len() != items.len() {
        return Err(DocumentError::UnsupportedArray {
            path: path.to_string(),
            reason: "array mixes objects and scalars".to_string(),
        });
    }
    Ok(FieldKind::ObjectArray(objects))
}

/// Reject field names the flat layout cannot represent.
///
/// Nested fields become the last segment of a reference-set key, so they
/// must be non-empty and free of `:`. [`ARRAY_FIELDS`] is reserved on every
/// node.
pub fn check_field_name(field: &str, kind: &FieldKind<'_>, path: &str) -> DocumentResult<()> {
    let nested = matches!(kind, FieldKind::Object(_) | FieldKind::ObjectArray(_));
    let reason = if field == ARRAY_FIELDS {
        "name is reserved"
    } else if nested && field.is_empty() {
        "nested field names must not be empty"
    } else if nested && field.contains(':') {
        "nested field names must not contain ':'"
    } else {
        return Ok(());
    };
    Err(DocumentError::InvalidFieldName {
        path: path.to_string(),
        field: field.to_string(),
        reason,
    })
}

/// Text form of a scalar attribute
pub fn encode_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text form of a bare scalar array: its compact JSON
pub fn encode_scalar_array(items: &[Value]) -> String {
    Value::Array(items.to_vec()).to_string()
}

/// Decode stored attribute text.
///
/// Integer-parsable text becomes an integer; everything else is returned
/// as a string.
pub fn decode_attribute(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(n) => Value::Number(Number::from(n)),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Decode an attribute listed in [`ARRAY_FIELDS`].
///
/// Text that is not a JSON array is kept as a string.
pub fn decode_scalar_array(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Value::Array(items),
        _ => Value::String(text.to_string()),
    }
}

/// Text of the [`ARRAY_FIELDS`] attribute
pub fn encode_array_fields(fields: &BTreeSet<String>) -> String {
    Value::Array(fields.iter().cloned().map(Value::String).collect()).to_string()
}

/// Field names listed in an [`ARRAY_FIELDS`] attribute; empty if unreadable
pub fn decode_array_fields(text: &str) -> BTreeSet<String> {
    serde_json::from_str(text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_scalars() {
        for v in [json!("x"), json!(1), json!(true), json!(null), json!(1.5)] {
            assert!(matches!(classify(&v, "f").unwrap(), FieldKind::Scalar(_)));
        }
    }

    #[test]
    fn test_classify_object_array() {
        let v = json!([{"objectId": "a"}, {"objectId": "b"}]);
        match classify(&v, "f").unwrap() {
            FieldKind::ObjectArray(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_scalar_array_and_empty() {
        let v = json!(["a", "b"]);
        assert!(matches!(classify(&v, "f").unwrap(), FieldKind::ScalarArray(items) if items.len() == 2));
        let empty = json!([]);
        assert!(matches!(classify(&empty, "f").unwrap(), FieldKind::ScalarArray(items) if items.is_empty()));
    }

    #[test]
    fn test_classify_mixed_array_rejected() {
        let v = json!([{"objectId": "a"}, 3]);
        let err = classify(&v, "plan.things").unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedArray { ref path, .. } if path == "plan.things"));
    }

    #[test]
    fn test_classify_nested_array_rejected() {
        let v = json!([[1, 2]]);
        assert!(classify(&v, "f").is_err());
    }

    #[test]
    fn test_encode_scalar() {
        assert_eq!(encode_scalar(&json!("abc")), "abc");
        assert_eq!(encode_scalar(&json!(20)), "20");
        assert_eq!(encode_scalar(&json!(true)), "true");
        assert_eq!(encode_scalar(&json!(null)), "null");
        assert_eq!(encode_scalar(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_decode_integer_coercion() {
        assert_eq!(decode_attribute("20"), json!(20));
        assert_eq!(decode_attribute("-3"), json!(-3));
        // Lossy by contract: leading zeros collapse, floats and booleans stay text
        assert_eq!(decode_attribute("007"), json!(7));
        assert_eq!(decode_attribute("2.5"), json!("2.5"));
        assert_eq!(decode_attribute("true"), json!("true"));
        assert_eq!(decode_attribute("12-01-2017"), json!("12-01-2017"));
    }

    #[test]
    fn test_scalar_array_text_restored() {
        let items = vec![json!("in"), json!("out"), json!(3)];
        let text = encode_scalar_array(&items);
        assert_eq!(text, r#"["in","out",3]"#);
        assert_eq!(decode_scalar_array(&text), json!(["in", "out", 3]));
        assert_eq!(decode_scalar_array("[]"), json!([]));
        assert_eq!(decode_scalar_array("[draft"), json!("[draft"));
    }

    #[test]
    fn test_bracketed_text_stays_text() {
        assert_eq!(decode_attribute("[1,2]"), json!("[1,2]"));
        assert_eq!(decode_attribute("[draft]"), json!("[draft]"));
    }

    #[test]
    fn test_array_fields_attribute() {
        let fields: BTreeSet<String> = ["tags".to_string(), "codes".to_string()].into();
        let text = encode_array_fields(&fields);
        assert_eq!(text, r#"["codes","tags"]"#);
        assert_eq!(decode_array_fields(&text), fields);
        assert!(decode_array_fields("garbage").is_empty());
    }

    #[test]
    fn test_field_name_rules() {
        let child = json!({"objectId": "c1", "objectType": "t"});
        let nested = classify(&child, "$.a").unwrap();
        let scalar = json!("x");
        let flat = classify(&scalar, "$.a").unwrap();

        assert!(check_field_name("planCostShares", &nested, "$.planCostShares").is_ok());
        assert!(check_field_name("a:b", &flat, "$.a:b").is_ok());
        assert!(matches!(
            check_field_name("a:b", &nested, "$.a:b"),
            Err(DocumentError::InvalidFieldName { ref field, .. }) if field == "a:b"
        ));
        assert!(check_field_name("", &nested, "$.").is_err());
        assert!(check_field_name(ARRAY_FIELDS, &flat, "$.@arrays").is_err());
    }
}
