//! Channel errors

use thiserror::Error;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The consumer side of a partition is gone
    #[error("Partition {0} is closed")]
    Closed(usize),

    /// A channel needs at least one partition
    #[error("Channel requires at least one partition")]
    NoPartitions,

    /// Message bytes are not a valid notification
    #[error("Cannot decode notification: {0}")]
    Decode(String),
}
