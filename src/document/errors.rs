//! Document shape errors
//!
//! Every variant describes an input the caller can fix, so all of them map
//! to a bad-request class error further up.

use thiserror::Error;

/// Result type for document shape checks
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while classifying or walking a document tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The node at `path` is not a JSON object
    #[error("Expected an object at {path}")]
    NotAnObject { path: String },

    /// An object node lacks `objectId` or `objectType`
    #[error("Object at {path} is missing required field '{field}'")]
    MissingIdentity { path: String, field: &'static str },

    /// `objectId`/`objectType` is present but not usable as a key part
    #[error("Object at {path} has an invalid '{field}': {reason}")]
    InvalidIdentity {
        path: String,
        field: &'static str,
        reason: String,
    },

    /// An array mixes objects with scalars, or nests arrays
    #[error("Unsupported array shape at {path}: {reason}")]
    UnsupportedArray { path: String, reason: String },

    /// A field name the flat layout cannot hold
    #[error("Invalid field name '{field}' at {path}: {reason}")]
    InvalidFieldName {
        path: String,
        field: String,
        reason: &'static str,
    },

    /// Nesting exceeds the configured bound
    #[error("Document nesting at {path} exceeds the maximum depth of {max_depth}")]
    TooDeep { path: String, max_depth: usize },
}

impl DocumentError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::NotAnObject { .. } => "DOCUMENT_NOT_AN_OBJECT",
            DocumentError::MissingIdentity { .. } => "DOCUMENT_MISSING_IDENTITY",
            DocumentError::InvalidIdentity { .. } => "DOCUMENT_INVALID_IDENTITY",
            DocumentError::UnsupportedArray { .. } => "DOCUMENT_UNSUPPORTED_ARRAY",
            DocumentError::InvalidFieldName { .. } => "DOCUMENT_INVALID_FIELD_NAME",
            DocumentError::TooDeep { .. } => "DOCUMENT_TOO_DEEP",
        }
    }
}
