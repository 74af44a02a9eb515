//! Partitioned Append-Only Log
//!
//! A cluster of nodes that together serve a set of independent logs, one per
//! partition key. Every key has exactly one owning node, chosen by hashing the
//! key over the sorted member list. The owner assigns offsets; other nodes
//! forward writes to it and read its persisted snapshots from a shared
//! key-value service.
//!
//! ## Modules
//! - **`config`**: clap command line and validated node settings.
//! - **`kv`**: the shared key-value contract (`KvStore`), an in-memory store,
//!   its HTTP service, and the HTTP client used by nodes.
//! - **`log`**: partitions, the write serializer, durability, committed
//!   offsets, the optimistic append path, and the client HTTP surface.
//! - **`membership`**: static cluster membership.
//! - **`transport`**: node-to-node request/reply (`Transport`) over HTTP.

pub mod config;
pub mod kv;
pub mod log;
pub mod membership;
pub mod transport;
