//! Store adapter errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Backend failures. None of them are retried by the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A hash operation hit a set key or the reverse
    #[error("Wrong value type at key '{key}': expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// A lock guarding in-process state was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,

    /// Any failure reported by a remote backend
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::WrongType { .. } => "STORE_WRONG_TYPE",
            StoreError::Poisoned => "STORE_POISONED",
            StoreError::Backend(_) => "STORE_BACKEND_ERROR",
        }
    }
}
