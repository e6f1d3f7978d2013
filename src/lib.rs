//! planstore - hierarchical plan documents over flat key-value storage
//!
//! - `flat`: decompose documents into hash records and reference sets, and
//!   rebuild or cascade-delete them
//! - `etag` / `plan`: content-hash ETags and the conditional mutation protocol
//! - `channel` / `indexer`: ordered change notifications and the search
//!   index synchronizer consuming them

pub mod channel;
pub mod cli;
pub mod config;
pub mod document;
pub mod etag;
pub mod flat;
pub mod indexer;
pub mod observability;
pub mod plan;
pub mod store;
