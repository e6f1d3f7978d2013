//! Notification handler keeping the search index in step with the store
//!
//! Both handlers are idempotent, so at-least-once delivery is safe:
//! - SAVE creates the index if absent, then upserts every node
//! - DELETE removes every node; ids that are not indexed are skipped

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::channel::{Notification, Operation};
use crate::config::PlanStoreConfig;
use crate::observability::{log_event, Event, MetricsRegistry, ObservationScope};

use super::engine::{DeleteStatus, Refresh, SearchEngine};
use super::errors::{IndexError, IndexResult};
use super::schema::IndexSchema;
use super::walker::{index_documents, index_ids};

/// What one notification did to the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub index_created: bool,
    pub upserted: usize,
    pub deleted: usize,
    pub missing: usize,
}

/// Applies change notifications to a search engine
pub struct IndexSynchronizer {
    engine: Arc<dyn SearchEngine>,
    schema: IndexSchema,
    max_depth: usize,
    metrics: Arc<MetricsRegistry>,
}

impl IndexSynchronizer {
    pub fn new(engine: Arc<dyn SearchEngine>, config: &PlanStoreConfig) -> Self {
        Self {
            engine,
            schema: IndexSchema::plan(
                config.index_name.clone(),
                config.index_shards,
                config.index_replicas,
            ),
            max_depth: config.max_depth,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Apply one notification
    pub fn handle(&self, notification: &Notification) -> IndexResult<SyncReport> {
        let doc = notification.document()?;
        let result = match notification.operation {
            Operation::Save => self.save(&doc),
            Operation::Delete => self.delete(&doc),
        };
        if result.is_err() {
            self.metrics.increment_index_failures();
        }
        result
    }

    /// Create the index with the plan schema unless it already exists.
    ///
    /// Returns whether this call created it.
    pub fn ensure_index(&self) -> IndexResult<bool> {
        if self.engine.index_exists(self.schema.name())? {
            return Ok(false);
        }
        match self.engine.create_index(&self.schema) {
            Ok(()) => {
                let shards = self.schema.shards().to_string();
                log_event(
                    Event::IndexCreated,
                    &[("index", self.schema.name()), ("shards", shards.as_str())],
                );
                Ok(true)
            }
            // Another consumer created it first
            Err(IndexError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn save(&self, doc: &Value) -> IndexResult<SyncReport> {
        let docs = index_documents(doc, self.max_depth)?;
        let root = docs.first().map(|d| d.id.clone()).unwrap_or_default();
        let scope = ObservationScope::new(
            "INDEX_SYNC",
            &[("operation", "SAVE"), ("id", root.as_str())],
        );

        let mut report = SyncReport::default();
        let result = self.ensure_index().and_then(|created| {
            report.index_created = created;
            for d in &docs {
                self.engine.upsert(self.schema.name(), d, Refresh::Immediate)?;
                report.upserted += 1;
            }
            Ok(())
        });
        if let Err(e) = result {
            scope.fail(&e.to_string());
            return Err(e);
        }

        self.metrics.increment_index_saves();
        let nodes = report.upserted.to_string();
        log_event(Event::IndexSave, &[("id", root.as_str()), ("nodes", nodes.as_str())]);
        scope.complete(&[("nodes", nodes.as_str())]);
        Ok(report)
    }

    fn delete(&self, doc: &Value) -> IndexResult<SyncReport> {
        let ids = index_ids(doc, self.max_depth)?;
        let root = ids.first().cloned().unwrap_or_default();
        let mut report = SyncReport::default();

        if !self.engine.index_exists(self.schema.name())? {
            report.missing = ids.len();
            log_event(
                Event::IndexDeleteMissing,
                &[("id", root.as_str()), ("reason", "index does not exist")],
            );
            return Ok(report);
        }

        for id in &ids {
            match self.engine.delete(self.schema.name(), id, Refresh::Immediate)? {
                DeleteStatus::Deleted => report.deleted += 1,
                DeleteStatus::NotFound => {
                    report.missing += 1;
                    log_event(Event::IndexDeleteMissing, &[("id", id.as_str())]);
                }
            }
        }

        self.metrics.increment_index_deletes();
        let deleted = report.deleted.to_string();
        log_event(Event::IndexDelete, &[("id", root.as_str()), ("nodes", deleted.as_str())]);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::MemorySearchEngine;
    use serde_json::json;

    fn setup() -> (IndexSynchronizer, Arc<MemorySearchEngine>) {
        let engine = Arc::new(MemorySearchEngine::new());
        let sync = IndexSynchronizer::new(engine.clone(), &PlanStoreConfig::default());
        (sync, engine)
    }

    fn plan() -> Value {
        json!({
            "objectId": "p1",
            "objectType": "plan",
            "planCostShares": {"objectId": "c1", "objectType": "membercostshare", "copay": 20},
            "linkedPlanServices": [{
                "objectId": "s1",
                "objectType": "planservice",
                "planserviceCostShares": {"objectId": "c2", "objectType": "membercostshare", "copay": 0}
            }]
        })
    }

    #[test]
    fn test_save_creates_index_once() {
        let (sync, engine) = setup();
        let first = sync.handle(&Notification::save(&plan())).unwrap();
        assert!(first.index_created);
        assert_eq!(first.upserted, 4);

        let again = sync.handle(&Notification::save(&plan())).unwrap();
        assert!(!again.index_created);
        assert_eq!(engine.document_count("plan-index"), 4);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (sync, engine) = setup();
        sync.handle(&Notification::save(&plan())).unwrap();

        let first = sync.handle(&Notification::delete(&plan())).unwrap();
        assert_eq!(first.deleted, 4);
        assert_eq!(engine.document_count("plan-index"), 0);

        let second = sync.handle(&Notification::delete(&plan())).unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(second.missing, 4);
    }

    #[test]
    fn test_delete_before_index_exists() {
        let (sync, engine) = setup();
        let report = sync.handle(&Notification::delete(&plan())).unwrap();
        assert_eq!(report.missing, 4);
        assert!(!engine.index_exists("plan-index").unwrap());
    }

    #[test]
    fn test_bad_body_counts_failure() {
        let (sync, _) = setup();
        let bad = Notification {
            operation: Operation::Save,
            body: "[1, 2".to_string(),
        };
        assert!(matches!(sync.handle(&bad), Err(IndexError::Decode(_))));
        assert_eq!(sync.metrics().snapshot().index_failures, 1);
    }
}
