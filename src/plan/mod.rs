//! Plan service and concurrency control
//!
//! Create, read, replace, merge-patch and delete plan documents, guarded by
//! content-hash ETags:
//!
//! - create fails with Conflict on an existing key
//! - update / patch / delete need a match-token set: none at all is
//!   PreconditionRequired, no matching token is a PreconditionFailed
//!   outcome carrying the current ETag
//! - reads honour a none-match set and answer NotModified without a body

mod errors;
mod merge;
mod outcome;
mod service;

pub use errors::{ErrorKind, PlanError, PlanResult};
pub use merge::merge_patch;
pub use outcome::{Conditional, Created, ReadOutcome, Updated};
pub use service::PlanService;
