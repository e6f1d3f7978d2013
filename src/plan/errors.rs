//! Plan service errors
//!
//! | Kind                  | HTTP | Code                         |
//! |-----------------------|------|------------------------------|
//! | NotFound              | 404  | PLAN_NOT_FOUND               |
//! | Conflict              | 409  | PLAN_CONFLICT                |
//! | PreconditionRequired  | 428  | PLAN_PRECONDITION_REQUIRED   |
//! | PreconditionFailed    | 412  | PLAN_PRECONDITION_FAILED     |
//! | BadRequest            | 400  | PLAN_BAD_REQUEST, PLAN_INVALID_DOCUMENT, PLAN_ETAG_PARSE |
//! | Internal              | 500  | PLAN_INTERNAL, PLAN_STORE_ERROR |

use thiserror::Error;

use crate::document::DocumentError;
use crate::etag::{ETag, ETagError};
use crate::flat::FlatError;
use crate::store::StoreError;

/// Result type for plan operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Error classes exposed to upstream collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionRequired,
    PreconditionFailed,
    BadRequest,
    Internal,
}

/// Plan service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Nothing stored under the key
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Create on a key that already exists
    #[error("Plan already exists: {0}")]
    Conflict(String),

    /// Mutation without any match token
    #[error("ETag is not provided with request")]
    PreconditionRequired,

    /// Match tokens supplied, none equal to the stored one
    #[error("Plan has been updated; current ETag is {current}")]
    PreconditionFailed { current: ETag },

    /// Request is inconsistent with the stored data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Document shape not supported
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),

    /// Match header is not parsable
    #[error(transparent)]
    InvalidETag(#[from] ETagError),

    /// Backend failure
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    /// Anything else that is not the caller's fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlanError {
    /// Error class
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::NotFound(_) => ErrorKind::NotFound,
            PlanError::Conflict(_) => ErrorKind::Conflict,
            PlanError::PreconditionRequired => ErrorKind::PreconditionRequired,
            PlanError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            PlanError::BadRequest(_) | PlanError::InvalidDocument(_) | PlanError::InvalidETag(_) => {
                ErrorKind::BadRequest
            }
            PlanError::Store(_) | PlanError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::NotFound(_) => "PLAN_NOT_FOUND",
            PlanError::Conflict(_) => "PLAN_CONFLICT",
            PlanError::PreconditionRequired => "PLAN_PRECONDITION_REQUIRED",
            PlanError::PreconditionFailed { .. } => "PLAN_PRECONDITION_FAILED",
            PlanError::BadRequest(_) => "PLAN_BAD_REQUEST",
            PlanError::InvalidDocument(_) => "PLAN_INVALID_DOCUMENT",
            PlanError::InvalidETag(_) => "PLAN_ETAG_PARSE",
            PlanError::Store(_) => "PLAN_STORE_ERROR",
            PlanError::Internal(_) => "PLAN_INTERNAL",
        }
    }

    /// HTTP status an upstream layer should answer with
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PreconditionRequired => 428,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::BadRequest => 400,
            ErrorKind::Internal => 500,
        }
    }

    /// The stored ETag carried by a precondition failure
    pub fn current_etag(&self) -> Option<&ETag> {
        match self {
            PlanError::PreconditionFailed { current } => Some(current),
            _ => None,
        }
    }
}

impl From<FlatError> for PlanError {
    fn from(err: FlatError) -> Self {
        match err {
            FlatError::NotFound(key) => PlanError::NotFound(key),
            FlatError::Document(e) => PlanError::InvalidDocument(e),
            FlatError::Store(e) => PlanError::Store(e),
            other @ (FlatError::Cycle(_) | FlatError::TooDeep { .. }) => {
                PlanError::Internal(other.to_string())
            }
        }
    }
}
