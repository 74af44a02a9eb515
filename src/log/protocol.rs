//! Log Client Protocol
//!
//! Endpoints and JSON bodies of the client-facing surface. Field names
//! follow the usual Kafka-style workload: `msg` for the appended value,
//! `msgs` for poll results, `offsets` for offset maps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::partition::Entry;

pub const ENDPOINT_SEND: &str = "/send";
pub const ENDPOINT_POLL: &str = "/poll";
pub const ENDPOINT_COMMIT_OFFSETS: &str = "/commit_offsets";
pub const ENDPOINT_LIST_COMMITTED_OFFSETS: &str = "/list_committed_offsets";

/// Appends `msg` to partition `key`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendRequest {
    pub key: String,
    pub msg: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub offset: u64,
}

/// Starting offset per partition. Signed so that a negative offset reaches
/// the range check and is reported as out of range.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollRequest {
    pub offsets: HashMap<String, i64>,
}

/// Up to one page of `[offset, value]` pairs per requested key.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    pub msgs: HashMap<String, Vec<Entry>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitOffsetsRequest {
    pub client: String,
    pub offsets: HashMap<String, u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CommitOffsetsResponse {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCommittedOffsetsRequest {
    pub client: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCommittedOffsetsResponse {
    pub offsets: HashMap<String, u64>,
}

/// Body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: u16,
    pub message: String,
}
