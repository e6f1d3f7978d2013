//! CLI error types

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::indexer::IndexError;
use crate::plan::PlanError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Demo failed: {0}")]
    Demo(String),
}

impl CliError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Io(_) => "CLI_IO_ERROR",
            CliError::Json(_) => "CLI_JSON_ERROR",
            CliError::Config(_) => "CLI_CONFIG_ERROR",
            CliError::Document(e) => e.code(),
            CliError::Plan(e) => e.code(),
            CliError::Index(e) => e.code(),
            CliError::Demo(_) => "CLI_DEMO_FAILED",
        }
    }
}
