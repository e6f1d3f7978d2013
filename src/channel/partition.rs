//! In-process partitioned channel

use tokio::sync::mpsc;

use crate::document::ObjectKey;

use super::errors::{ChannelError, ChannelResult};
use super::notification::Notification;
use super::Publisher;

/// Partition a key is routed to
pub fn partition_for(key: &ObjectKey, partitions: usize) -> usize {
    if partitions <= 1 {
        return 0;
    }
    crc32fast::hash(key.to_string().as_bytes()) as usize % partitions
}

/// Producer handle of a partitioned channel
#[derive(Debug, Clone)]
pub struct PartitionedChannel {
    senders: Vec<mpsc::UnboundedSender<Notification>>,
}

impl PartitionedChannel {
    /// Create a channel and the receivers of each of its partitions.
    ///
    /// The channel closes once every clone of the returned handle is dropped.
    pub fn new(partitions: usize) -> ChannelResult<(Self, Vec<PartitionReceiver>)> {
        if partitions == 0 {
            return Err(ChannelError::NoPartitions);
        }

        let mut senders = Vec::with_capacity(partitions);
        let mut receivers = Vec::with_capacity(partitions);
        for partition in 0..partitions {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(PartitionReceiver {
                partition,
                receiver: rx,
            });
        }
        Ok((Self { senders }, receivers))
    }

    /// Number of partitions
    pub fn partitions(&self) -> usize {
        self.senders.len()
    }
}

impl Publisher for PartitionedChannel {
    fn publish(&self, key: &ObjectKey, notification: Notification) -> ChannelResult<()> {
        let partition = partition_for(key, self.senders.len());
        self.senders[partition]
            .send(notification)
            .map_err(|_| ChannelError::Closed(partition))
    }
}

/// Consumer side of one partition
#[derive(Debug)]
pub struct PartitionReceiver {
    partition: usize,
    receiver: mpsc::UnboundedReceiver<Notification>,
}

impl PartitionReceiver {
    /// Index of this partition
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Next notification, or `None` once the channel is closed and drained
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// Next notification if one is already queued
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }
}
