//! Recording publisher
//!
//! Keeps every notification in memory instead of delivering it. Useful
//! where the mutation path runs without an index pipeline attached.

use std::sync::Mutex;

use crate::document::ObjectKey;

use super::errors::{ChannelError, ChannelResult};
use super::notification::Notification;
use super::Publisher;

/// Publisher that records notifications in send order
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    sent: Mutex<Vec<(ObjectKey, Notification)>>,
    closed: bool,
}

impl MemoryPublisher {
    /// Recording publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher whose channel is already closed; every publish fails
    pub fn closed() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            closed: true,
        }
    }

    /// Everything published so far
    pub fn published(&self) -> Vec<(ObjectKey, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drain everything published so far
    pub fn take(&self) -> Vec<(ObjectKey, Notification)> {
        self.sent
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default()
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, key: &ObjectKey, notification: Notification) -> ChannelResult<()> {
        if self.closed {
            return Err(ChannelError::Closed(0));
        }
        let mut sent = self.sent.lock().map_err(|_| ChannelError::Closed(0))?;
        sent.push((key.clone(), notification));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Operation;
    use serde_json::json;

    #[test]
    fn test_records_in_order() {
        let publisher = MemoryPublisher::new();
        let key = ObjectKey::new("plan", "p1");
        publisher.publish(&key, Notification::delete(&json!({}))).unwrap();
        publisher.publish(&key, Notification::save(&json!({}))).unwrap();

        let ops: Vec<Operation> = publisher.take().into_iter().map(|(_, n)| n.operation).collect();
        assert_eq!(ops, vec![Operation::Delete, Operation::Save]);
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn test_closed_publisher_fails() {
        let publisher = MemoryPublisher::closed();
        assert!(publisher
            .publish(&ObjectKey::new("plan", "p1"), Notification::save(&json!({})))
            .is_err());
    }
}
