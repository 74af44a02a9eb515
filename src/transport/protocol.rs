//! Peer Protocol
//!
//! Bodies are tagged with a `type` field; every request carries a `msg_id`
//! which the reply echoes as `in_reply_to`, so both sides can correlate a
//! forwarded operation in their logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal endpoint receiving forwarded operations from peers.
pub const ENDPOINT_PEER: &str = "/internal/peer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerRequest {
    /// An append forwarded by a node that does not own `key`.
    Send { msg_id: Uuid, key: String, msg: i64 },
}

impl PeerRequest {
    pub fn send(key: impl Into<String>, msg: i64) -> Self {
        PeerRequest::Send {
            msg_id: Uuid::new_v4(),
            key: key.into(),
            msg,
        }
    }

    pub fn msg_id(&self) -> Uuid {
        match self {
            PeerRequest::Send { msg_id, .. } => *msg_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerReply {
    SendOk { in_reply_to: Uuid, offset: u64 },
}
