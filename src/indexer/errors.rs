//! Index synchronization errors
//!
//! Error codes:
//! - INDEX_MISSING: target index does not exist
//! - INDEX_EXISTS: create raced with another creator
//! - INDEX_MAPPING: document rejected by the index mapping
//! - INDEX_ENGINE: search engine unreachable or failing
//! - INDEX_DOCUMENT: notification body is not a valid plan tree
//! - INDEX_DECODE: notification body is not JSON
//!
//! Only engine-side failures are worth redelivering; a body that cannot be
//! parsed or mapped fails the same way every time.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::document::DocumentError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index synchronization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Index '{0}' does not exist")]
    IndexMissing(String),

    #[error("Index '{0}' already exists")]
    AlreadyExists(String),

    #[error("Document '{id}' rejected by mapping: {reason}")]
    Mapping { id: String, reason: String },

    #[error("Search engine failure: {0}")]
    Engine(String),

    #[error("Invalid document: {0}")]
    Document(#[from] DocumentError),

    #[error("Undecodable notification: {0}")]
    Decode(#[from] ChannelError),
}

impl IndexError {
    pub fn mapping(id: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::Mapping {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::IndexMissing(_) => "INDEX_MISSING",
            IndexError::AlreadyExists(_) => "INDEX_EXISTS",
            IndexError::Mapping { .. } => "INDEX_MAPPING",
            IndexError::Engine(_) => "INDEX_ENGINE",
            IndexError::Document(_) => "INDEX_DOCUMENT",
            IndexError::Decode(_) => "INDEX_DECODE",
        }
    }

    /// Whether delivering the same notification again can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IndexError::Engine(_) | IndexError::IndexMissing(_) | IndexError::AlreadyExists(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(IndexError::Engine("timeout".into()).is_retryable());
        assert!(!IndexError::mapping("p1", "bad date").is_retryable());
        assert!(!IndexError::Decode(ChannelError::Decode("eof".into())).is_retryable());
    }

    #[test]
    fn test_codes() {
        assert_eq!(IndexError::IndexMissing("plan-index".into()).code(), "INDEX_MISSING");
        assert_eq!(IndexError::mapping("c1", "x").code(), "INDEX_MAPPING");
    }
}
