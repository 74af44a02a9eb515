//! Request Router / Forwarder
//!
//! `LogNode` is what the HTTP handlers talk to. It decides, per key, whether
//! the operation is served here or by the owning peer:
//! - **send**: local owner → write serializer; remote owner → forwarded over
//!   the transport, the peer's offset relayed unchanged.
//! - **poll**: owned keys from the serializer's authoritative log, other keys
//!   from the last snapshot in the store.
//! - **commit / list offsets**: straight to the checkpoint store, whatever the owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use super::checkpoint::OffsetCheckpointStore;
use super::durability::DurabilityAdapter;
use super::error::{LogError, LogResult};
use super::optimistic::OptimisticAppender;
use super::partition::{Entry, read_page};
use super::partitioner::PartitionRouter;
use super::serializer::WriteSerializer;
use crate::kv::KvStore;
use crate::membership::cluster::Cluster;
use crate::membership::types::NodeId;
use crate::transport::Transport;
use crate::transport::protocol::{PeerReply, PeerRequest};

/// How appends are made durable and ordered. Must be the same on every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AppendStrategy {
    /// One owner per partition, appends serialized in the owner's memory.
    #[default]
    Leader,
    /// No owners; every append is a compare-and-swap on the store.
    Optimistic,
}

#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub strategy: AppendStrategy,
    /// Capacity of the write serializer's inbox.
    pub queue_depth: usize,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            strategy: AppendStrategy::Leader,
            queue_depth: 1024,
        }
    }
}

pub struct LogNode<T, S> {
    router: PartitionRouter,
    serializer: WriteSerializer,
    durability: Arc<DurabilityAdapter<S>>,
    checkpoints: OffsetCheckpointStore<S>,
    optimistic: OptimisticAppender<S>,
    transport: T,
    strategy: AppendStrategy,
    persister: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport, S: KvStore> LogNode<T, S> {
    /// Builds the node and spawns its write serializer and snapshot
    /// persister. Must be called inside a tokio runtime.
    pub fn start(cluster: &Cluster, transport: T, store: Arc<S>, options: NodeOptions) -> Arc<Self> {
        let durability = Arc::new(DurabilityAdapter::new(store.clone()));
        let (serializer, _actor) = WriteSerializer::spawn(options.queue_depth, durability.dirty());
        let persister = durability.spawn_persister(serializer.clone());

        tracing::info!(
            "Node {} started ({:?} strategy, {} members)",
            cluster.self_id(),
            options.strategy,
            cluster.len()
        );

        Arc::new(Self {
            router: PartitionRouter::new(cluster),
            serializer,
            durability,
            checkpoints: OffsetCheckpointStore::new(store.clone()),
            optimistic: OptimisticAppender::new(store),
            transport,
            strategy: options.strategy,
            persister: Mutex::new(Some(persister)),
        })
    }

    pub fn local_id(&self) -> &NodeId {
        self.router.local_id()
    }

    pub fn owner(&self, key: &str) -> &NodeId {
        self.router.owner(key)
    }

    pub fn strategy(&self) -> AppendStrategy {
        self.strategy
    }

    pub async fn send(&self, key: String, value: i64) -> LogResult<u64> {
        validate_key(&key)?;

        if self.strategy == AppendStrategy::Optimistic {
            return self.optimistic.append(&key, value).await;
        }

        let owner = self.router.owner(&key);
        if owner == self.router.local_id() {
            tracing::debug!("send {} handled locally", key);
            return self.serializer.append(key, value).await;
        }

        self.forward_send(owner, key, value).await
    }

    async fn forward_send(&self, owner: &NodeId, key: String, value: i64) -> LogResult<u64> {
        let request = PeerRequest::send(key.clone(), value);
        let msg_id = request.msg_id();
        tracing::debug!("send {} forwarded to {} (msg {})", key, owner, msg_id);

        let reply = self
            .transport
            .call(owner, request)
            .await
            .map_err(|e| LogError::Routing {
                node: owner.clone(),
                reason: format!("{:#}", e),
            })?;

        match reply {
            PeerReply::SendOk { in_reply_to, offset } if in_reply_to == msg_id => Ok(offset),
            PeerReply::SendOk { in_reply_to, .. } => Err(LogError::Routing {
                node: owner.clone(),
                reason: format!("reply to {} does not match request {}", in_reply_to, msg_id),
            }),
        }
    }

    /// Serves an operation forwarded by a peer. Never forwards again: a key
    /// this node does not own means the peers disagree on membership.
    pub async fn handle_peer(&self, request: PeerRequest) -> LogResult<PeerReply> {
        match request {
            PeerRequest::Send { msg_id, key, msg } => {
                validate_key(&key)?;

                let offset = match self.strategy {
                    AppendStrategy::Optimistic => self.optimistic.append(&key, msg).await?,
                    AppendStrategy::Leader => {
                        if !self.router.is_local(&key) {
                            tracing::warn!(
                                "Forwarded send {} for {} but owner is {}",
                                msg_id,
                                key,
                                self.router.owner(&key)
                            );
                            return Err(LogError::Misrouted {
                                key,
                                node: self.router.local_id().clone(),
                            });
                        }
                        self.serializer.append(key, msg).await?
                    }
                };

                tracing::debug!("forwarded send {} appended at {}", msg_id, offset);
                Ok(PeerReply::SendOk {
                    in_reply_to: msg_id,
                    offset,
                })
            }
        }
    }

    /// Reads one page per key. Any invalid offset fails the whole request.
    pub async fn poll(&self, offsets: HashMap<String, i64>) -> LogResult<HashMap<String, Vec<Entry>>> {
        let mut msgs = HashMap::with_capacity(offsets.len());

        for (key, from) in offsets {
            let page = match self.strategy {
                AppendStrategy::Optimistic => {
                    let entries = self.optimistic.read(&key).await?;
                    read_page(&key, &entries, from)?
                }
                AppendStrategy::Leader if self.router.is_local(&key) => {
                    self.serializer.range(key.clone(), from).await?
                }
                AppendStrategy::Leader => {
                    let entries = self.durability.read_remote(&key).await?;
                    read_page(&key, &entries, from)?
                }
            };
            msgs.insert(key, page);
        }

        Ok(msgs)
    }

    pub async fn commit_offsets(&self, client: &str, offsets: HashMap<String, u64>) -> LogResult<()> {
        validate_client(client)?;
        for key in offsets.keys() {
            validate_key(key)?;
        }
        self.checkpoints.commit(client, &offsets).await
    }

    pub async fn list_committed_offsets(
        &self,
        client: &str,
        keys: &[String],
    ) -> LogResult<HashMap<String, u64>> {
        validate_client(client)?;
        self.checkpoints.list(client, keys).await
    }

    /// Stops the persister after it has written every partition appended to
    /// since its last round. Call once the HTTP surface no longer accepts
    /// requests; later appends are held in memory only.
    pub async fn shutdown(&self) {
        let persister = self
            .persister
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = persister {
            self.durability.stop();
            if let Err(e) = handle.await {
                tracing::warn!("Snapshot persister ended abnormally: {}", e);
            }
        }
    }
}

impl<T, S> Drop for LogNode<T, S> {
    fn drop(&mut self) {
        let persister = self
            .persister
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = persister {
            handle.abort();
        }
    }
}

fn validate_key(key: &str) -> LogResult<()> {
    if key.is_empty() {
        return Err(LogError::Malformed("partition key must not be empty".to_string()));
    }
    Ok(())
}

fn validate_client(client: &str) -> LogResult<()> {
    if client.is_empty() {
        return Err(LogError::Malformed("client id must not be empty".to_string()));
    }
    Ok(())
}
