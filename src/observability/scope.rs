//! Begin/complete bracketing for multi-step operations
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` on [`ObservationScope::complete`]
//! - `{name}_FAILED` on [`ObservationScope::fail`]
//! - `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use super::logger::{Logger, Severity};

/// Logs the start and end of an operation
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    /// Open a scope and log `{name}_BEGIN`
    pub fn new(name: &str, fields: &[(&str, &str)]) -> Self {
        let scope = Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            finished: false,
        };
        scope.log(Severity::Trace, "BEGIN", &[]);
        scope
    }

    /// Log `{name}_COMPLETE` with the elapsed time and any extra fields
    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        self.log(Severity::Info, "COMPLETE", extra);
    }

    /// Log `{name}_FAILED` with a reason
    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        self.log(Severity::Error, "FAILED", &[("reason", reason)]);
    }

    fn log(&self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.started.elapsed().as_micros().to_string();
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        fields.extend_from_slice(extra);
        if suffix != "BEGIN" {
            fields.push(("elapsed_us", elapsed.as_str()));
        }
        Logger::log(severity, &event, &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            self.log(Severity::Warn, "INCOMPLETE", &[]);
        }
    }
}
