//! Key-Value Service Protocol
//!
//! JSON bodies exchanged between `HttpKv` and the `kv` service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ENDPOINT_KV_READ: &str = "/kv/read";
pub const ENDPOINT_KV_WRITE: &str = "/kv/write";
pub const ENDPOINT_KV_CAS: &str = "/kv/cas";

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadRequest {
    pub key: String,
}

/// Returned with 200 when the key exists; an absent key is a 404 with `value: null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResponse {
    pub value: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub key: String,
    pub value: Value,
}

/// Conditional write. A `null` `from` means "expect the key to be absent".
#[derive(Debug, Serialize, Deserialize)]
pub struct CasRequest {
    pub key: String,
    pub from: Option<Value>,
    pub to: Value,
    #[serde(default)]
    pub create_if_not_exists: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KvAck {}
