//! Cluster Membership
//!
//! The node set is fixed when a node starts and never changes afterwards:
//! there is no discovery, failure detection or rebalancing. Every node is
//! started with the same member list and derives the same ordering from it.
//!
//! - **`types`**: `NodeId` and `Node` (identity plus HTTP address).
//! - **`cluster`**: `Cluster`, the validated, sorted member list plus the local identity.

pub mod cluster;
pub mod types;
