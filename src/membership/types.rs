use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single member of the cluster.
///
/// Membership is fixed for the lifetime of a run, so a node is nothing more
/// than a stable identifier and the address its HTTP surface listens on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub http_addr: SocketAddr,
}

impl FromStr for Node {
    type Err = anyhow::Error;

    /// Parses the `<id>=<host:port>` form used on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, addr) = s
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected <id>=<addr>, got '{}'", s))?;

        let id = id.trim();
        if id.is_empty() {
            return Err(anyhow::anyhow!("empty node id in '{}'", s));
        }

        let http_addr = addr
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid address for node {}: {}", id, e))?;

        Ok(Self {
            id: NodeId::new(id),
            http_addr,
        })
    }
}
