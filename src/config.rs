//! Configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event, Event};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON for this structure
    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Values parsed but are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Crate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStoreConfig {
    /// Search index receiving plan documents (default: "plan-index")
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Primary shards of a newly created index (default: 1)
    #[serde(default = "default_shards")]
    pub index_shards: u32,

    /// Replicas of a newly created index (default: 1)
    #[serde(default = "default_replicas")]
    pub index_replicas: u32,

    /// Reference fields that always read back as arrays,
    /// even with a single member (default: ["linkedPlanServices"])
    #[serde(default = "default_collection_fields")]
    pub collection_fields: Vec<String>,

    /// Maximum nesting depth below the root (default: 32)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Partitions of the notification channel (default: 4)
    #[serde(default = "default_partitions")]
    pub channel_partitions: usize,

    /// Retries of a failing notification before it is dead-lettered (default: 3)
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,

    /// Base backoff between retries, doubled per attempt (default: 50ms)
    #[serde(default = "default_backoff_ms")]
    pub redelivery_backoff_ms: u64,
}

fn default_index_name() -> String {
    "plan-index".to_string()
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

fn default_collection_fields() -> Vec<String> {
    vec!["linkedPlanServices".to_string()]
}

fn default_max_depth() -> usize {
    32
}

fn default_partitions() -> usize {
    4
}

fn default_max_redeliveries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    50
}

impl Default for PlanStoreConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            index_shards: default_shards(),
            index_replicas: default_replicas(),
            collection_fields: default_collection_fields(),
            max_depth: default_max_depth(),
            channel_partitions: default_partitions(),
            max_redeliveries: default_max_redeliveries(),
            redelivery_backoff_ms: default_backoff_ms(),
        }
    }
}

impl PlanStoreConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;
        config.validate()?;

        log_event(
            Event::ConfigLoaded,
            &[("path", display.as_str()), ("index", config.index_name.as_str())],
        );
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.index_name.trim().is_empty() {
            return Err(ConfigError::Invalid("index_name must not be empty".to_string()));
        }
        if self.index_shards == 0 {
            return Err(ConfigError::Invalid("index_shards must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".to_string()));
        }
        if self.channel_partitions == 0 {
            return Err(ConfigError::Invalid(
                "channel_partitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlanStoreConfig::default();
        assert_eq!(config.index_name, "plan-index");
        assert_eq!(config.index_shards, 1);
        assert_eq!(config.index_replicas, 1);
        assert_eq!(config.collection_fields, vec!["linkedPlanServices"]);
        assert_eq!(config.channel_partitions, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: PlanStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlanStoreConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"index_name": "plans-v2", "channel_partitions": 8}}"#).unwrap();

        let config = PlanStoreConfig::load(file.path()).unwrap();
        assert_eq!(config.index_name, "plans-v2");
        assert_eq!(config.channel_partitions, 8);
        assert_eq!(config.max_redeliveries, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PlanStoreConfig::load(Path::new("/nonexistent/planstore.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PlanStoreConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_partitions() {
        let config = PlanStoreConfig {
            channel_partitions: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
