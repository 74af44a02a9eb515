//! Command line configuration for the log node and the key-value service.

use crate::log::node::{AppendStrategy, NodeOptions};
use crate::membership::cluster::Cluster;
use crate::membership::types::{Node, NodeId};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "partitioned-log")]
#[command(about = "Partitioned append-only log cluster")]
pub struct CliArgs {
    /// Fallback filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a log node.
    Node(NodeArgs),
    /// Run the shared key-value service.
    Kv(KvArgs),
}

#[derive(Debug, Args)]
pub struct NodeArgs {
    /// Id of this node. Must appear in `--peer`.
    #[arg(long, env = "NODE_ID")]
    pub node_id: String,

    /// Cluster member as `<id>=<addr>`, this node included.
    #[arg(long = "peer", value_delimiter = ',', required = true)]
    pub peers: Vec<Node>,

    /// Listen address. Defaults to this node's member address.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Address of the key-value service.
    #[arg(long, env = "KV_ADDR")]
    pub kv_addr: SocketAddr,

    #[arg(long, value_enum, default_value_t = AppendStrategy::Leader)]
    pub strategy: AppendStrategy,

    /// Deadline for a forwarded request. Unset waits indefinitely.
    #[arg(long)]
    pub peer_timeout_ms: Option<u64>,

    /// Attempts for a peer connection that could not be established.
    #[arg(long, default_value_t = 3)]
    pub peer_retries: usize,

    /// Capacity of the write serializer inbox.
    #[arg(long, default_value_t = 1024)]
    pub queue_depth: usize,
}

#[derive(Debug, Args)]
pub struct KvArgs {
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub bind: SocketAddr,
}

/// Validated settings for one log node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub cluster: Arc<Cluster>,
    pub bind: SocketAddr,
    pub kv_addr: SocketAddr,
    pub options: NodeOptions,
    pub peer_timeout: Option<Duration>,
    pub peer_retries: usize,
}

impl NodeConfig {
    pub fn from_args(args: NodeArgs) -> anyhow::Result<Self> {
        let local_id = NodeId::new(args.node_id);
        let cluster = Cluster::new(local_id.clone(), args.peers)
            .with_context(|| format!("invalid membership for node {}", local_id))?;

        let bind = match args.bind {
            Some(addr) => addr,
            None => cluster
                .get_member(&local_id)
                .map(|node| node.http_addr)
                .with_context(|| format!("no address for node {}", local_id))?,
        };

        if args.queue_depth == 0 {
            anyhow::bail!("--queue-depth must be at least 1");
        }
        if args.peer_retries == 0 {
            anyhow::bail!("--peer-retries must be at least 1");
        }

        Ok(Self {
            cluster: Arc::new(cluster),
            bind,
            kv_addr: args.kv_addr,
            options: NodeOptions {
                strategy: args.strategy,
                queue_depth: args.queue_depth,
            },
            peer_timeout: args.peer_timeout_ms.map(Duration::from_millis),
            peer_retries: args.peer_retries,
        })
    }
}
