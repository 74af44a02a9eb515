use anyhow::Result;
use std::collections::HashSet;

use super::types::{Node, NodeId};

/// Fixed view of the cluster shared by every component of a node.
///
/// Members are kept sorted by id, so two nodes configured with the same set
/// of members agree on the ordering even if the flags were given in a
/// different order. Partition ownership depends on that ordering.
#[derive(Debug, Clone)]
pub struct Cluster {
    local_id: NodeId,
    members: Vec<Node>,
}

impl Cluster {
    pub fn new(local_id: NodeId, mut members: Vec<Node>) -> Result<Self> {
        if members.is_empty() {
            return Err(anyhow::anyhow!("cluster must have at least one member"));
        }

        let mut seen = HashSet::new();
        for node in &members {
            if !seen.insert(node.id.clone()) {
                return Err(anyhow::anyhow!("duplicate node id: {}", node.id));
            }
        }

        if !seen.contains(&local_id) {
            return Err(anyhow::anyhow!(
                "local node {} is not part of the member list",
                local_id
            ));
        }

        members.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(Self { local_id, members })
    }

    pub fn self_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Ordered member ids, identical on every node.
    pub fn member_ids(&self) -> Vec<NodeId> {
        self.members.iter().map(|node| node.id.clone()).collect()
    }

    pub fn members(&self) -> &[Node] {
        &self.members
    }

    pub fn get_member(&self, id: &NodeId) -> Option<&Node> {
        self.members.iter().find(|node| &node.id == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
