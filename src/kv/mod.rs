//! Shared Key-Value Store
//!
//! The durability substrate every node can reach: `read`, unconditional
//! `write` and `cas` over opaque JSON values. Consistency is per key only:
//! operations issued by one process keep their program order, nothing is
//! promised across keys or across processes.
//!
//! - **`memory`**: `MemoryKv`, the in-process store (also what the `kv` service hosts).
//! - **`http`**: `HttpKv`, a client for a store hosted by another process.
//! - **`handlers`** / **`protocol`**: the HTTP service exposing a `MemoryKv`.

pub mod handlers;
pub mod http;
pub mod memory;
pub mod protocol;

#[cfg(test)]
mod tests;

use serde_json::Value;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("kv transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("kv encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("kv service returned status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Swapped,
    Conflict,
}

/// Operations the log needs from the external store.
///
/// `cas` swaps a present key only if its current value equals `from`. An
/// absent key is created only when `create_if_absent` is set and `from` is
/// `None`; every other combination is a conflict.
pub trait KvStore: Send + Sync + 'static {
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Value>, KvError>> + Send;

    fn write(&self, key: &str, value: Value) -> impl Future<Output = Result<(), KvError>> + Send;

    fn cas(
        &self,
        key: &str,
        from: Option<Value>,
        to: Value,
        create_if_absent: bool,
    ) -> impl Future<Output = Result<CasOutcome, KvError>> + Send;
}
