//! Observability: structured logs and counters
//!
//! # Principles
//!
//! 1. Observability never changes the outcome of an operation
//! 2. One log line is one event, rendered as JSON with sorted fields
//! 3. Counters are monotonic and process-local
//!
//! # Usage
//!
//! ```ignore
//! use planstore::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::PlanCreate, &[("key", "plan:p1")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_plans_created();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
