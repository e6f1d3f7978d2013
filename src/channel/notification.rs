//! Notification wire format
//!
//! `{"operation": "SAVE" | "DELETE", "body": "<document JSON text>"}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ChannelError, ChannelResult};

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Document created or replaced
    Save,
    /// Document removed
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Save => "SAVE",
            Operation::Delete => "DELETE",
        }
    }
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub operation: Operation,
    /// Full document text at operation time
    pub body: String,
}

impl Notification {
    /// SAVE notification for a document
    pub fn save(doc: &Value) -> Self {
        Self {
            operation: Operation::Save,
            body: doc.to_string(),
        }
    }

    /// DELETE notification for a document
    pub fn delete(doc: &Value) -> Self {
        Self {
            operation: Operation::Delete,
            body: doc.to_string(),
        }
    }

    /// Parse the body back into a document
    pub fn document(&self) -> ChannelResult<Value> {
        serde_json::from_str(&self.body).map_err(|e| ChannelError::Decode(e.to_string()))
    }

    /// Encode for an external broker
    pub fn to_bytes(&self) -> ChannelResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ChannelError::Decode(e.to_string()))
    }

    /// Decode a message received from an external broker
    pub fn from_bytes(bytes: &[u8]) -> ChannelResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}
