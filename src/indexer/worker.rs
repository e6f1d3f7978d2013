//! Partition consumers
//!
//! One worker task drains one partition, so notifications for a key are
//! applied in send order. A failing notification is retried in place with
//! exponential backoff, which holds back the rest of its partition; after
//! `max_redeliveries` retries it is dead-lettered and the partition moves on.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::channel::{Notification, PartitionReceiver};
use crate::config::PlanStoreConfig;
use crate::observability::{log_event, Event, MetricsRegistry};

use super::synchronizer::IndexSynchronizer;

/// Totals for one drained partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub partition: usize,
    pub applied: usize,
    pub redeliveries: usize,
    pub dead_letters: usize,
}

/// Drains partitions into an [`IndexSynchronizer`]
pub struct IndexWorker {
    synchronizer: Arc<IndexSynchronizer>,
    max_redeliveries: u32,
    backoff: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl IndexWorker {
    pub fn new(synchronizer: Arc<IndexSynchronizer>, config: &PlanStoreConfig) -> Self {
        Self {
            synchronizer,
            max_redeliveries: config.max_redeliveries,
            backoff: Duration::from_millis(config.redelivery_backoff_ms),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start one task per partition
    pub fn spawn(self: Arc<Self>, receivers: Vec<PartitionReceiver>) -> Vec<JoinHandle<WorkerStats>> {
        receivers
            .into_iter()
            .map(|receiver| {
                let worker = Arc::clone(&self);
                tokio::spawn(async move { worker.drain(receiver).await })
            })
            .collect()
    }

    /// Consume a partition until its channel is closed and empty
    pub async fn drain(&self, mut receiver: PartitionReceiver) -> WorkerStats {
        let mut stats = WorkerStats {
            partition: receiver.partition(),
            ..WorkerStats::default()
        };
        let partition = stats.partition.to_string();
        log_event(Event::WorkerStarted, &[("partition", partition.as_str())]);

        while let Some(notification) = receiver.recv().await {
            self.deliver(&notification, &mut stats).await;
        }

        let applied = stats.applied.to_string();
        log_event(
            Event::WorkerStopped,
            &[("partition", partition.as_str()), ("applied", applied.as_str())],
        );
        stats
    }

    async fn deliver(&self, notification: &Notification, stats: &mut WorkerStats) {
        let mut attempt: u32 = 0;
        loop {
            let err = match self.synchronizer.handle(notification) {
                Ok(_) => {
                    stats.applied += 1;
                    return;
                }
                Err(e) => e,
            };

            let attempts = (attempt + 1).to_string();
            if !err.is_retryable() || attempt >= self.max_redeliveries {
                stats.dead_letters += 1;
                self.metrics.increment_dead_letters();
                log_event(
                    Event::IndexDeadLetter,
                    &[
                        ("operation", notification.operation.as_str()),
                        ("attempts", attempts.as_str()),
                        ("code", err.code()),
                        ("error", err.to_string().as_str()),
                        ("body", notification.body.as_str()),
                    ],
                );
                return;
            }

            stats.redeliveries += 1;
            self.metrics.increment_redeliveries();
            log_event(
                Event::IndexRedelivery,
                &[
                    ("operation", notification.operation.as_str()),
                    ("attempts", attempts.as_str()),
                    ("error", err.to_string().as_str()),
                ],
            );
            tokio::time::sleep(self.backoff * 2u32.saturating_pow(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{partition_for, PartitionedChannel, Publisher};
    use crate::document::ObjectKey;
    use crate::indexer::MemorySearchEngine;
    use serde_json::json;

    #[tokio::test]
    async fn test_drains_until_closed() {
        let config = PlanStoreConfig::default();
        let engine = Arc::new(MemorySearchEngine::new());
        let sync = Arc::new(IndexSynchronizer::new(engine.clone(), &config));
        let worker = Arc::new(IndexWorker::new(sync, &config));

        let (channel, receivers) = PartitionedChannel::new(2).unwrap();
        let handles = worker.spawn(receivers);

        let key = ObjectKey::new("plan", "p1");
        let doc = json!({"objectId": "p1", "objectType": "plan"});
        channel.publish(&key, Notification::save(&doc)).unwrap();
        channel.publish(&key, Notification::delete(&doc)).unwrap();
        channel.publish(&key, Notification::save(&doc)).unwrap();
        drop(channel);

        let mut applied = 0;
        for handle in handles {
            let stats = handle.await.unwrap();
            if stats.partition == partition_for(&key, 2) {
                assert_eq!(stats.applied, 3);
            }
            applied += stats.applied;
        }
        assert_eq!(applied, 3);
        // Last in send order was SAVE
        assert!(engine.get("plan-index", "p1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unretryable_goes_straight_to_dead_letter() {
        let config = PlanStoreConfig::default();
        let sync = Arc::new(IndexSynchronizer::new(
            Arc::new(MemorySearchEngine::new()),
            &config,
        ));
        let worker = IndexWorker::new(sync, &config);

        let (channel, mut receivers) = PartitionedChannel::new(1).unwrap();
        let key = ObjectKey::new("plan", "p1");
        let bad = json!({"objectId": "p1", "objectType": "plan", "copay": "lots"});
        channel.publish(&key, Notification::save(&bad)).unwrap();
        drop(channel);

        let stats = worker.drain(receivers.remove(0)).await;
        assert_eq!(stats.dead_letters, 1);
        assert_eq!(stats.redeliveries, 0);
    }
}
