//! Partitioned Log
//!
//! Partition ownership and replicated append. Each partition key has exactly
//! one owner, `members[hash(key) % members.len()]`, which holds the
//! authoritative sequence in memory and persists snapshots of it to the
//! shared store; other nodes forward appends to the owner and read the
//! persisted snapshot.
//!
//! ## Submodules
//! - **`partitioner`**: key → owning node.
//! - **`partition`**: in-memory sequences, offset assignment, paged reads.
//! - **`serializer`**: the single-writer actor in front of `partition`.
//! - **`durability`**: snapshot persistence and reads of peer-owned partitions.
//! - **`checkpoint`**: per-client committed offsets.
//! - **`optimistic`**: the leaderless compare-and-swap alternative.
//! - **`node`**: `LogNode`, routing each operation locally or to the owner.
//! - **`protocol`** / **`handlers`**: the HTTP surface.
//! - **`error`**: `LogError`.

pub mod checkpoint;
pub mod durability;
pub mod error;
pub mod handlers;
pub mod node;
pub mod optimistic;
pub mod partition;
pub mod partitioner;
pub mod protocol;
pub mod serializer;
