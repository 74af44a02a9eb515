//! Log error types.

use crate::kv::KvError;
use crate::membership::types::NodeId;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Every failure is scoped to the request that triggered it; none of them
/// stops the node.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A poll asked for an offset below zero or past the end of the partition.
    #[error("offset {offset} for key {key} is out of bound (length {len})")]
    OffsetOutOfRange { key: String, offset: i64, len: usize },

    /// Input rejected before it reached the log.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The owning peer could not be reached or answered with an error.
    #[error("forwarding to {node} failed: {reason}")]
    Routing { node: NodeId, reason: String },

    /// A forwarded append arrived at a node that does not own the key.
    #[error("node {node} does not own key {key}")]
    Misrouted { key: String, node: NodeId },

    #[error("store error: {0}")]
    Store(#[from] KvError),

    /// The stored value of a partition is not a sequence of integers.
    #[error("corrupt partition state for key {key}: {source}")]
    CorruptState {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("write serializer is not running")]
    SerializerClosed,
}

impl LogError {
    /// Numeric code carried in error bodies, using the conventional
    /// Maelstrom numbering.
    pub fn code(&self) -> u16 {
        match self {
            LogError::OffsetOutOfRange { .. } => 14,
            LogError::Malformed(_) => 12,
            LogError::Routing { .. } => 11,
            LogError::Misrouted { .. } => 11,
            LogError::Store(_) => 13,
            LogError::CorruptState { .. } => 13,
            LogError::SerializerClosed => 11,
        }
    }
}
