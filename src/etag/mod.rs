//! Content-hash version tokens
//!
//! An ETag is `"` + base64(SHA-256(canonical JSON)) + `"`. The canonical
//! form sorts object keys at every level, so documents that differ only in
//! key order hash identically.

mod condition;

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use condition::{ETagError, ETagResult, EntityTag, MatchCondition};

/// Opaque quoted version token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Wrap an already quoted token as read back from storage
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The quoted token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The token without its surrounding quotes
    pub fn opaque(&self) -> &str {
        self.0
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the ETag of a document
pub fn compute_etag(doc: &Value) -> ETag {
    let mut canonical = String::new();
    write_canonical(&mut canonical, doc);

    let digest = Sha256::digest(canonical.as_bytes());
    ETag(format!("\"{}\"", STANDARD.encode(digest)))
}

/// Canonical serialization: compact JSON with object keys sorted
pub fn canonical_json(doc: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, doc);
    out
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
