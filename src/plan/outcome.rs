//! Results of plan operations
//!
//! Conditional mismatches are ordinary values, not errors: the caller gets
//! the current ETag back and decides whether to refresh and retry.

use serde_json::Value;

use crate::document::ObjectKey;
use crate::etag::ETag;

use super::errors::{PlanError, PlanResult};

/// Successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub key: ObjectKey,
    pub etag: ETag,
}

/// Successful update or patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub etag: ETag,
    pub previous: ETag,
}

/// Result of a read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The caller's none-match set holds the current ETag; no body
    NotModified { etag: ETag },
    /// Current body. Only root documents carry an ETag.
    Found { body: Value, etag: Option<ETag> },
}

impl ReadOutcome {
    /// Body, if one was returned
    pub fn body(&self) -> Option<&Value> {
        match self {
            ReadOutcome::NotModified { .. } => None,
            ReadOutcome::Found { body, .. } => Some(body),
        }
    }

    /// ETag to send back with the response
    pub fn etag(&self) -> Option<&ETag> {
        match self {
            ReadOutcome::NotModified { etag } => Some(etag),
            ReadOutcome::Found { etag, .. } => etag.as_ref(),
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, ReadOutcome::NotModified { .. })
    }
}

/// Result of a conditional mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<T> {
    /// Tokens matched and the mutation was applied
    Applied(T),
    /// None of the tokens matched; nothing changed
    PreconditionFailed { current: ETag },
}

impl<T> Conditional<T> {
    /// Turn a mismatch into [`PlanError::PreconditionFailed`]
    pub fn into_result(self) -> PlanResult<T> {
        match self {
            Conditional::Applied(value) => Ok(value),
            Conditional::PreconditionFailed { current } => {
                Err(PlanError::PreconditionFailed { current })
            }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Conditional::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_result() {
        let ok: Conditional<u8> = Conditional::Applied(1);
        assert_eq!(ok.into_result(), Ok(1));

        let current = ETag::from_stored("\"v1\"");
        let failed: Conditional<u8> = Conditional::PreconditionFailed {
            current: current.clone(),
        };
        assert!(!failed.is_applied());
        assert_eq!(failed.into_result(), Err(PlanError::PreconditionFailed { current }));
    }

    #[test]
    fn test_read_outcome_accessors() {
        let etag = ETag::from_stored("\"v1\"");
        let not_modified = ReadOutcome::NotModified { etag: etag.clone() };
        assert!(not_modified.body().is_none());
        assert_eq!(not_modified.etag(), Some(&etag));

        let child = ReadOutcome::Found {
            body: json!({"objectId": "c1"}),
            etag: None,
        };
        assert!(child.etag().is_none());
        assert!(!child.is_not_modified());
    }
}
