//! Object keys
//!
//! Every object node is stored under `objectType:objectId`. Reference sets
//! hang off that key as `objectType:objectId:fieldName`.

use std::fmt;

use serde_json::{Map, Value};

use super::errors::{DocumentError, DocumentResult};

/// Identifier field carried by every object node
pub const OBJECT_ID: &str = "objectId";

/// Type field carried by every object node
pub const OBJECT_TYPE: &str = "objectType";

/// Reserved attribute holding the version token on root records
pub const ETAG_FIELD: &str = "eTag";

/// Backend key of one object node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    object_type: String,
    object_id: String,
}

impl ObjectKey {
    /// Create a key from its parts
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }

    /// Extract the key of an object node.
    ///
    /// `path` is only used for error messages.
    pub fn of(node: &Map<String, Value>, path: &str) -> DocumentResult<Self> {
        let object_type = identity_part(node, OBJECT_TYPE, path)?;
        if object_type.contains(':') {
            return Err(DocumentError::InvalidIdentity {
                path: path.to_string(),
                field: OBJECT_TYPE,
                reason: "must not contain ':'".to_string(),
            });
        }
        let object_id = identity_part(node, OBJECT_ID, path)?;
        Ok(Self {
            object_type,
            object_id,
        })
    }

    /// Parse `objectType:objectId`. The type ends at the first colon.
    pub fn parse(key: &str) -> Option<Self> {
        let (object_type, object_id) = key.split_once(':')?;
        if object_type.is_empty() || object_id.is_empty() {
            return None;
        }
        Some(Self::new(object_type, object_id))
    }

    /// The `objectType` part
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// The `objectId` part
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Key of the reference set realizing `field` on this node
    pub fn reference_key(&self, field: &str) -> String {
        format!("{}:{}:{}", self.object_type, self.object_id, field)
    }

    /// Prefix shared by every reference set of this node
    pub fn reference_prefix(&self) -> String {
        format!("{}:{}:", self.object_type, self.object_id)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

fn identity_part(node: &Map<String, Value>, field: &'static str, path: &str) -> DocumentResult<String> {
    let text = match node.get(field) {
        None | Some(Value::Null) => {
            return Err(DocumentError::MissingIdentity {
                path: path.to_string(),
                field,
            })
        }
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DocumentError::InvalidIdentity {
                path: path.to_string(),
                field,
                reason: format!("expected a string, found {}", type_name(other)),
            })
        }
    };

    if text.is_empty() {
        return Err(DocumentError::InvalidIdentity {
            path: path.to_string(),
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(text)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
