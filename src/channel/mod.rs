//! Change notification channel
//!
//! Carries `{operation, body}` notifications from the mutation path to the
//! index synchronizer.
//!
//! # Ordering
//!
//! The synchronizer is only correct if notifications for the same document
//! key are consumed in send order. [`PartitionedChannel`] provides that by
//! routing every notification for a key to the same partition (CRC32 of the
//! key modulo the partition count). Each partition is one FIFO queue drained
//! by exactly one consumer. Different keys may interleave freely.

mod errors;
mod memory;
mod notification;
mod partition;

pub use errors::{ChannelError, ChannelResult};
pub use memory::MemoryPublisher;
pub use notification::{Notification, Operation};
pub use partition::{partition_for, PartitionReceiver, PartitionedChannel};

use crate::document::ObjectKey;

/// Producer side of the channel
pub trait Publisher: Send + Sync {
    /// Send a notification about the document stored under `key`
    fn publish(&self, key: &ObjectKey, notification: Notification) -> ChannelResult<()>;
}
