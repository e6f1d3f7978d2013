//! CLI argument definitions using clap
//!
//! Commands:
//! - planstore etag <file>
//! - planstore decompose <file> [--config <path>]
//! - planstore index-docs <file> [--config <path>]
//! - planstore demo <file> [--config <path>]
//!
//! `<file>` may be `-` to read the document from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// planstore - hierarchical plan documents over flat key-value storage
#[derive(Parser, Debug)]
#[command(name = "planstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the ETag of a document
    Etag {
        /// Document file, or "-" for stdin
        file: PathBuf,
    },

    /// Print the flat records and reference sets of a document
    Decompose {
        /// Document file, or "-" for stdin
        file: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the search index documents of a document
    IndexDocs {
        /// Document file, or "-" for stdin
        file: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Store, read back and index a document against in-memory backends
    Demo {
        /// Document file, or "-" for stdin
        file: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
