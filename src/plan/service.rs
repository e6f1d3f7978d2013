//! Plan service: the conditional mutation protocol
//!
//! Every mutation follows the same order:
//!
//! 1. check existence and the caller's match tokens
//! 2. validate the new document completely (no partial writes on bad input)
//! 3. write the primary store and install a fresh ETag
//! 4. publish change notifications
//!
//! Notifications go out only after the primary store is written. A failed
//! publish is logged and counted; it never undoes the write, because the
//! primary store is authoritative over the search index.
//!
//! No in-process lock is held. Two writers racing on one key are resolved
//! by the ETag comparison, at whole-document granularity.

use std::sync::Arc;

use serde_json::Value;

use crate::channel::{Notification, Publisher};
use crate::config::PlanStoreConfig;
use crate::document::{encode_scalar, ObjectKey, ETAG_FIELD, OBJECT_ID, OBJECT_TYPE};
use crate::etag::{compute_etag, ETag, MatchCondition};
use crate::flat::{cascade_delete, decompose, reconstruct, Decomposition, DeleteReport, FlatOptions};
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::store::KeyValueStore;

use super::errors::{PlanError, PlanResult};
use super::merge::merge_patch;
use super::outcome::{Conditional, Created, ReadOutcome, Updated};

/// Conditional CRUD over plan documents
pub struct PlanService {
    store: Arc<dyn KeyValueStore>,
    publisher: Arc<dyn Publisher>,
    options: FlatOptions,
    metrics: Arc<MetricsRegistry>,
}

impl PlanService {
    /// Create a service over a store and a notification publisher
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        publisher: Arc<dyn Publisher>,
        config: &PlanStoreConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            options: FlatOptions::from_config(config),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Share a metrics registry with other components
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn options(&self) -> &FlatOptions {
        &self.options
    }

    /// ETag stored on `key`; `None` for child records and missing keys
    pub fn current_etag(&self, key: &ObjectKey) -> PlanResult<Option<ETag>> {
        Ok(self
            .store
            .hash_get(&key.to_string(), ETAG_FIELD)?
            .map(ETag::from_stored))
    }

    /// Store a new document under its own `objectType:objectId`.
    ///
    /// Fails with [`PlanError::Conflict`] if the key already exists.
    pub fn create(&self, doc: &Value) -> PlanResult<Created> {
        let decomposition = decompose(doc, self.options.max_depth)?;
        let key = decomposition.root().clone();
        let k = key.to_string();
        if self.store.hash_exists(&k)? {
            return Err(PlanError::Conflict(k));
        }
        if self.store.exists(&k)? {
            return Err(PlanError::BadRequest(format!(
                "{} is already used by a reference set",
                k
            )));
        }

        decomposition.apply(self.store.as_ref())?;
        let etag = self.install_etag(&key, doc)?;

        self.metrics.increment_plans_created();
        log_event(
            Event::PlanCreate,
            &[("key", key.to_string().as_str()), ("etag", etag.as_str())],
        );
        self.publish(&key, Notification::save(doc));

        Ok(Created { key, etag })
    }

    /// Read any stored object.
    ///
    /// Root documents whose ETag is in `if_none_match` come back as
    /// [`ReadOutcome::NotModified`] without a body.
    pub fn get(&self, key: &ObjectKey, if_none_match: &MatchCondition) -> PlanResult<ReadOutcome> {
        let k = key.to_string();
        if !self.store.hash_exists(&k)? {
            return Err(PlanError::NotFound(k));
        }

        let etag = self.current_etag(key)?;
        if let Some(etag) = etag.as_ref() {
            if if_none_match.matches_weak(etag) {
                return Ok(ReadOutcome::NotModified { etag: etag.clone() });
            }
        }

        let body = reconstruct(self.store.as_ref(), &k, &self.options)?;
        Ok(ReadOutcome::Found { body, etag })
    }

    /// Replace the document stored under `key` with `doc`
    pub fn update(
        &self,
        key: &ObjectKey,
        doc: &Value,
        if_match: &MatchCondition,
    ) -> PlanResult<Conditional<Updated>> {
        let previous = match self.check_precondition(key, if_match)? {
            Ok(current) => current,
            Err(current) => return Ok(Conditional::PreconditionFailed { current }),
        };

        let decomposition = decompose(doc, self.options.max_depth)?;
        if decomposition.root() != key {
            return Err(PlanError::BadRequest(format!(
                "Body describes {} but the target is {}",
                decomposition.root(),
                key
            )));
        }

        let etag = self.replace(key, doc, &decomposition)?;

        self.metrics.increment_plans_updated();
        log_event(
            Event::PlanUpdate,
            &[("key", key.to_string().as_str()), ("etag", etag.as_str())],
        );
        Ok(Conditional::Applied(Updated { etag, previous }))
    }

    /// Merge `patch` into the document stored under `key`
    pub fn patch(
        &self,
        key: &ObjectKey,
        patch: &Value,
        if_match: &MatchCondition,
    ) -> PlanResult<Conditional<Updated>> {
        let previous = match self.check_precondition(key, if_match)? {
            Ok(current) => current,
            Err(current) => return Ok(Conditional::PreconditionFailed { current }),
        };

        if !patch.is_object() {
            return Err(PlanError::BadRequest("Patch body must be an object".to_string()));
        }
        for (field, expected) in [(OBJECT_TYPE, key.object_type()), (OBJECT_ID, key.object_id())] {
            if let Some(given) = patch.get(field) {
                if encode_scalar(given) != expected {
                    return Err(PlanError::BadRequest(format!(
                        "Patch may not change '{}' of {}",
                        field, key
                    )));
                }
            }
        }

        let mut merged = reconstruct(self.store.as_ref(), &key.to_string(), &self.options)?;
        merge_patch(&mut merged, patch);
        let decomposition = decompose(&merged, self.options.max_depth)?;

        let etag = self.replace(key, &merged, &decomposition)?;

        self.metrics.increment_plans_patched();
        log_event(
            Event::PlanPatch,
            &[("key", key.to_string().as_str()), ("etag", etag.as_str())],
        );
        Ok(Conditional::Applied(Updated { etag, previous }))
    }

    /// Cascade-delete the document stored under `key`
    pub fn delete(&self, key: &ObjectKey, if_match: &MatchCondition) -> PlanResult<Conditional<DeleteReport>> {
        if let Err(current) = self.check_precondition(key, if_match)? {
            return Ok(Conditional::PreconditionFailed { current });
        }

        let k = key.to_string();
        let previous = reconstruct(self.store.as_ref(), &k, &self.options)?;
        let report = cascade_delete(self.store.as_ref(), &k, &self.options)?;

        self.metrics.increment_plans_deleted();
        let records = report.records_removed.to_string();
        log_event(Event::PlanDelete, &[("key", k.as_str()), ("records", records.as_str())]);
        self.publish(key, Notification::delete(&previous));

        Ok(Conditional::Applied(report))
    }

    /// `Ok(Ok(current))` when the tokens match, `Ok(Err(current))` when
    /// they do not.
    fn check_precondition(
        &self,
        key: &ObjectKey,
        if_match: &MatchCondition,
    ) -> PlanResult<Result<ETag, ETag>> {
        let k = key.to_string();
        if !self.store.hash_exists(&k)? {
            return Err(PlanError::NotFound(k));
        }
        let current = self
            .current_etag(key)?
            .ok_or_else(|| PlanError::BadRequest(format!("{} is not a root document", k)))?;

        if if_match.is_empty() {
            return Err(PlanError::PreconditionRequired);
        }
        if !if_match.matches_strong(&current) {
            self.metrics.increment_precondition_failures();
            log_event(
                Event::PreconditionFailed,
                &[("key", k.as_str()), ("current", current.as_str())],
            );
            return Ok(Err(current));
        }
        Ok(Ok(current))
    }

    /// Swap the stored subtree for a new one and announce both sides
    fn replace(&self, key: &ObjectKey, doc: &Value, decomposition: &Decomposition) -> PlanResult<ETag> {
        let k = key.to_string();
        let previous = reconstruct(self.store.as_ref(), &k, &self.options)?;

        cascade_delete(self.store.as_ref(), &k, &self.options)?;
        decomposition.apply(self.store.as_ref())?;
        let etag = self.install_etag(key, doc)?;

        let stored = reconstruct(self.store.as_ref(), &k, &self.options)?;
        self.publish(key, Notification::delete(&previous));
        self.publish(key, Notification::save(&stored));
        Ok(etag)
    }

    fn install_etag(&self, key: &ObjectKey, doc: &Value) -> PlanResult<ETag> {
        let etag = compute_etag(doc);
        self.store
            .hash_set(&key.to_string(), ETAG_FIELD, etag.as_str())?;
        Ok(etag)
    }

    fn publish(&self, key: &ObjectKey, notification: Notification) {
        let k = key.to_string();
        let operation = notification.operation.as_str();
        match self.publisher.publish(key, notification) {
            Ok(()) => {
                self.metrics.increment_notifications_published();
                log_event(
                    Event::NotificationPublished,
                    &[("key", k.as_str()), ("operation", operation)],
                );
            }
            Err(e) => {
                self.metrics.increment_notifications_dropped();
                log_event(
                    Event::NotificationDropped,
                    &[
                        ("key", k.as_str()),
                        ("operation", operation),
                        ("error", e.to_string().as_str()),
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryPublisher, Operation};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service() -> (PlanService, Arc<MemoryStore>, Arc<MemoryPublisher>) {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(MemoryPublisher::new());
        let service = PlanService::new(store.clone(), publisher.clone(), &PlanStoreConfig::default());
        (service, store, publisher)
    }

    fn plan() -> Value {
        json!({
            "objectId": "p1",
            "objectType": "plan",
            "planType": "inNetwork",
            "planCostShares": {"objectId": "c1", "objectType": "membercostshare", "copay": 20}
        })
    }

    fn key() -> ObjectKey {
        ObjectKey::new("plan", "p1")
    }

    #[test]
    fn test_create_then_conflict() {
        let (service, _, publisher) = service();
        let created = service.create(&plan()).unwrap();
        assert_eq!(created.key, key());
        assert_eq!(created.etag, compute_etag(&plan()));

        assert_eq!(
            service.create(&plan()),
            Err(PlanError::Conflict("plan:p1".to_string()))
        );
        assert_eq!(publisher.published().len(), 1);
        assert_eq!(service.metrics().snapshot().plans_created, 1);
    }

    #[test]
    fn test_create_rejects_bad_shape_without_writing() {
        let (service, store, publisher) = service();
        let doc = json!({"objectId": "p1", "objectType": "plan", "planCostShares": {"copay": 1}});
        assert!(matches!(service.create(&doc), Err(PlanError::InvalidDocument(_))));
        assert!(store.is_empty());
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn test_get_conditional() {
        let (service, _, _) = service();
        let created = service.create(&plan()).unwrap();

        let fresh = service.get(&key(), &MatchCondition::Empty).unwrap();
        assert_eq!(fresh.body(), Some(&plan()));
        assert_eq!(fresh.etag(), Some(&created.etag));

        let cached = service
            .get(&key(), &MatchCondition::of(&[created.etag.clone()]))
            .unwrap();
        assert_eq!(cached, ReadOutcome::NotModified { etag: created.etag });
    }

    #[test]
    fn test_get_child_has_no_etag() {
        let (service, _, _) = service();
        service.create(&plan()).unwrap();
        let out = service
            .get(&ObjectKey::new("membercostshare", "c1"), &MatchCondition::Any)
            .unwrap();
        assert!(out.etag().is_none());
        assert_eq!(out.body().unwrap()["copay"], 20);
    }

    #[test]
    fn test_get_missing() {
        let (service, _, _) = service();
        assert!(matches!(
            service.get(&key(), &MatchCondition::Empty),
            Err(PlanError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_protocol() {
        let (service, _, publisher) = service();
        let created = service.create(&plan()).unwrap();
        publisher.take();

        let mut new_doc = plan();
        new_doc["planType"] = json!("outOfNetwork");

        assert_eq!(
            service.update(&key(), &new_doc, &MatchCondition::Empty),
            Err(PlanError::PreconditionRequired)
        );

        let stale = MatchCondition::parse("\"stale\"").unwrap();
        assert_eq!(
            service.update(&key(), &new_doc, &stale).unwrap(),
            Conditional::PreconditionFailed {
                current: created.etag.clone()
            }
        );

        let ok = service
            .update(&key(), &new_doc, &MatchCondition::of(&[created.etag.clone()]))
            .unwrap()
            .into_result()
            .unwrap();
        assert_ne!(ok.etag, created.etag);
        assert_eq!(ok.previous, created.etag);
        assert_eq!(service.current_etag(&key()).unwrap(), Some(ok.etag));

        let ops: Vec<Operation> = publisher.take().into_iter().map(|(_, n)| n.operation).collect();
        assert_eq!(ops, vec![Operation::Delete, Operation::Save]);
    }

    #[test]
    fn test_update_removes_dropped_children() {
        let (service, store, _) = service();
        let created = service.create(&plan()).unwrap();
        let slim = json!({"objectId": "p1", "objectType": "plan", "planType": "inNetwork"});
        service
            .update(&key(), &slim, &MatchCondition::of(&[created.etag]))
            .unwrap();
        assert!(!store.exists("membercostshare:c1").unwrap());
        assert!(!store.exists("plan:p1:planCostShares").unwrap());
    }

    #[test]
    fn test_update_key_mismatch() {
        let (service, _, _) = service();
        let created = service.create(&plan()).unwrap();
        let other = json!({"objectId": "p2", "objectType": "plan"});
        assert!(matches!(
            service.update(&key(), &other, &MatchCondition::of(&[created.etag])),
            Err(PlanError::BadRequest(_))
        ));
        // Original still in place
        assert!(service.get(&key(), &MatchCondition::Empty).is_ok());
    }

    #[test]
    fn test_patch_merges() {
        let (service, _, publisher) = service();
        let created = service.create(&plan()).unwrap();
        publisher.take();

        let patch = json!({"planCostShares": {"copay": 30}, "_org": "example.com"});
        let updated = service
            .patch(&key(), &patch, &MatchCondition::of(&[created.etag.clone()]))
            .unwrap()
            .into_result()
            .unwrap();
        assert_ne!(updated.etag, created.etag);

        let body = service.get(&key(), &MatchCondition::Empty).unwrap();
        let body = body.body().unwrap();
        assert_eq!(body["planCostShares"]["copay"], 30);
        assert_eq!(body["planCostShares"]["objectId"], "c1");
        assert_eq!(body["_org"], "example.com");
        assert_eq!(body["planType"], "inNetwork");

        let sent = publisher.take();
        assert_eq!(sent.last().unwrap().1.operation, Operation::Save);
    }

    #[test]
    fn test_patch_cannot_change_identity() {
        let (service, _, _) = service();
        let created = service.create(&plan()).unwrap();
        assert!(matches!(
            service.patch(&key(), &json!({"objectId": "p9"}), &MatchCondition::of(&[created.etag])),
            Err(PlanError::BadRequest(_))
        ));
    }

    #[test]
    fn test_patch_may_repeat_numeric_identity() {
        let (service, _, _) = service();
        let doc = json!({"objectId": 42, "objectType": "plan", "planType": "inNetwork"});
        let created = service.create(&doc).unwrap();
        let key = ObjectKey::new("plan", "42");

        let patch = json!({"objectId": 42, "planType": "outOfNetwork"});
        let updated = service
            .patch(&key, &patch, &MatchCondition::of(&[created.etag]))
            .unwrap();
        assert!(updated.is_applied());

        let body = service.get(&key, &MatchCondition::Empty).unwrap();
        assert_eq!(body.body().unwrap()["planType"], "outOfNetwork");
    }

    #[test]
    fn test_reference_set_key_is_not_a_document() {
        let (service, store, _) = service();
        service.create(&plan()).unwrap();
        let set_key = ObjectKey::new("plan", "p1:planCostShares");

        assert!(matches!(
            service.get(&set_key, &MatchCondition::Empty),
            Err(PlanError::NotFound(_))
        ));
        let err = service
            .update(&set_key, &plan(), &MatchCondition::Any)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
        assert!(matches!(
            service.delete(&set_key, &MatchCondition::Any),
            Err(PlanError::NotFound(_))
        ));
        assert!(matches!(
            service.patch(&set_key, &json!({}), &MatchCondition::Any),
            Err(PlanError::NotFound(_))
        ));

        let clash = json!({"objectId": "p1:planCostShares", "objectType": "plan"});
        assert!(matches!(service.create(&clash), Err(PlanError::BadRequest(_))));
        assert_eq!(store.set_members("plan:p1:planCostShares").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_protocol() {
        let (service, store, publisher) = service();
        let created = service.create(&plan()).unwrap();
        publisher.take();

        assert_eq!(
            service.delete(&key(), &MatchCondition::Empty),
            Err(PlanError::PreconditionRequired)
        );
        assert!(!service
            .delete(&key(), &MatchCondition::parse("\"nope\"").unwrap())
            .unwrap()
            .is_applied());

        let report = service
            .delete(&key(), &MatchCondition::of(&[created.etag]))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(report.records_removed, 2);
        assert_eq!(report.reference_sets_removed, 1);
        assert!(store.is_empty());

        let sent = publisher.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.operation, Operation::Delete);
        assert_eq!(sent[0].1.document().unwrap(), plan());

        assert!(matches!(
            service.delete(&key(), &MatchCondition::Any),
            Err(PlanError::NotFound(_))
        ));
    }

    #[test]
    fn test_mutating_a_child_is_rejected() {
        let (service, _, _) = service();
        service.create(&plan()).unwrap();
        assert!(matches!(
            service.delete(&ObjectKey::new("membercostshare", "c1"), &MatchCondition::Any),
            Err(PlanError::BadRequest(_))
        ));
    }

    #[test]
    fn test_publish_failure_does_not_undo_write() {
        let store = Arc::new(MemoryStore::new());
        let service = PlanService::new(
            store.clone(),
            Arc::new(MemoryPublisher::closed()),
            &PlanStoreConfig::default(),
        );
        service.create(&plan()).unwrap();
        assert!(store.exists("plan:p1").unwrap());
        assert_eq!(service.metrics().snapshot().notifications_dropped, 1);
    }
}
