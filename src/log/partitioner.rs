use crate::membership::cluster::Cluster;
use crate::membership::types::NodeId;
use xxhash_rust::xxh3::xxh3_64;

/// Maps a partition key to the single node that owns it.
///
/// `owner(key) = members[xxh3(key) % members.len()]`. Every node builds its
/// router from the same sorted member list and the hash is fixed across
/// processes, so all nodes agree on every owner for the whole run.
#[derive(Debug, Clone)]
pub struct PartitionRouter {
    local_id: NodeId,
    nodes: Vec<NodeId>,
}

impl PartitionRouter {
    pub fn new(cluster: &Cluster) -> Self {
        Self {
            local_id: cluster.self_id().clone(),
            nodes: cluster.member_ids(),
        }
    }

    pub fn hash_key(key: &str) -> u64 {
        xxh3_64(key.as_bytes())
    }

    pub fn owner(&self, key: &str) -> &NodeId {
        // `Cluster` guarantees at least one member.
        let idx = (Self::hash_key(key) % self.nodes.len() as u64) as usize;
        &self.nodes[idx]
    }

    pub fn is_local(&self, key: &str) -> bool {
        self.owner(key) == &self.local_id
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::types::Node;
    use std::collections::HashMap;

    fn cluster(local: &str, ids: &[&str]) -> Cluster {
        let members = ids
            .iter()
            .enumerate()
            .map(|(i, id)| Node {
                id: NodeId::new(*id),
                http_addr: format!("127.0.0.1:{}", 7000 + i).parse().unwrap(),
            })
            .collect();
        Cluster::new(NodeId::new(local), members).unwrap()
    }

    #[test]
    fn test_owner_is_deterministic() {
        let router = PartitionRouter::new(&cluster("n0", &["n0", "n1", "n2"]));

        let first = router.owner("orders").clone();
        for _ in 0..10 {
            assert_eq!(router.owner("orders"), &first);
        }
    }

    #[test]
    fn test_owner_agrees_across_nodes() {
        let ids = ["n0", "n1", "n2"];
        let routers: Vec<PartitionRouter> = ids
            .iter()
            .map(|local| PartitionRouter::new(&cluster(local, &ids)))
            .collect();

        for i in 0..500 {
            let key = format!("key-{}", i);
            let owner = routers[0].owner(&key);
            assert!(routers.iter().all(|r| r.owner(&key) == owner), "{} disagrees", key);

            let locals = routers.iter().filter(|r| r.is_local(&key)).count();
            assert_eq!(locals, 1, "exactly one node must own {}", key);
        }
    }

    #[test]
    fn test_hash_is_stable() {
        // Pinned so that a change of hash function is caught: it would
        // reassign partitions between nodes of a running cluster.
        assert_eq!(PartitionRouter::hash_key(""), 0x2d06800538d394c2);
    }

    #[test]
    fn test_single_node_owns_everything() {
        let router = PartitionRouter::new(&cluster("solo", &["solo"]));
        assert!(router.is_local("a"));
        assert!(router.is_local("anything-else"));
    }

    #[test]
    fn test_owner_distribution() {
        let router = PartitionRouter::new(&cluster("n0", &["n0", "n1", "n2"]));
        let mut counts: HashMap<NodeId, usize> = HashMap::new();

        for i in 0..3000 {
            *counts.entry(router.owner(&format!("k{}", i)).clone()).or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 3, "every node should own some keys");
        assert!(counts.values().all(|&c| c > 700), "skewed: {:?}", counts);
    }
}
