//! CLI module for planstore
//!
//! Provides command-line access to:
//! - etag: content hash of a document
//! - decompose: flat records and reference sets
//! - index-docs: search index documents with join descriptors
//! - demo: the full create / read / index pipeline in memory

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{decompose_cmd, demo, etag, index_docs, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_document, write_error, write_response};
