//! Write Serializer
//!
//! A single actor task owns the node's `PartitionLog`. Appends and owned
//! reads reach it only through its inbox, so appends to a partition are
//! applied strictly in arrival order and no lock guards the sequences.
//!
//! For every append the actor
//! 1. appends in memory and takes the offset,
//! 2. replies with the offset,
//! 3. marks the partition dirty for the persister,
//!
//! and only then picks up the next command. Step 3 never waits for the store
//! and never copies the sequence: the persister later fetches a shared
//! snapshot through `snapshot`.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::durability::DirtyPartitions;
use super::error::{LogError, LogResult};
use super::partition::{Entry, PartitionLog};

enum Command {
    Append {
        key: String,
        value: i64,
        reply: oneshot::Sender<u64>,
    },
    Range {
        key: String,
        from: i64,
        reply: oneshot::Sender<LogResult<Vec<Entry>>>,
    },
    Snapshot {
        key: String,
        reply: oneshot::Sender<Arc<Vec<i64>>>,
    },
}

/// Cloneable handle to the actor. The actor stops once every handle is gone.
#[derive(Debug, Clone)]
pub struct WriteSerializer {
    inbox: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Append { key, value, .. } => write!(f, "Append({}, {})", key, value),
            Command::Range { key, from, .. } => write!(f, "Range({}, {})", key, from),
            Command::Snapshot { key, .. } => write!(f, "Snapshot({})", key),
        }
    }
}

impl WriteSerializer {
    pub fn spawn(
        queue_depth: usize,
        dirty: Arc<DirtyPartitions>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (inbox, commands) = mpsc::channel(queue_depth.max(1));
        let handle = tokio::spawn(run(commands, dirty));
        (Self { inbox }, handle)
    }

    pub async fn append(&self, key: String, value: i64) -> LogResult<u64> {
        let (reply, offset) = oneshot::channel();
        self.inbox
            .send(Command::Append { key, value, reply })
            .await
            .map_err(|_| LogError::SerializerClosed)?;
        offset.await.map_err(|_| LogError::SerializerClosed)
    }

    pub async fn range(&self, key: String, from: i64) -> LogResult<Vec<Entry>> {
        let (reply, page) = oneshot::channel();
        self.inbox
            .send(Command::Range { key, from, reply })
            .await
            .map_err(|_| LogError::SerializerClosed)?;
        page.await.map_err(|_| LogError::SerializerClosed)?
    }

    /// The whole current sequence of `key`, shared with the actor.
    pub async fn snapshot(&self, key: String) -> LogResult<Arc<Vec<i64>>> {
        let (reply, entries) = oneshot::channel();
        self.inbox
            .send(Command::Snapshot { key, reply })
            .await
            .map_err(|_| LogError::SerializerClosed)?;
        entries.await.map_err(|_| LogError::SerializerClosed)
    }
}

async fn run(mut commands: mpsc::Receiver<Command>, dirty: Arc<DirtyPartitions>) {
    tracing::info!("Write serializer started");
    let mut log = PartitionLog::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Append { key, value, reply } => {
                let offset = log.append(&key, value);

                if reply.send(offset).is_err() {
                    // The entry stays; the offset is simply never reported.
                    tracing::debug!("Requester for {} gone before offset {} was reported", key, offset);
                }

                dirty.mark(&key);
            }
            Command::Range { key, from, reply } => {
                let _ = reply.send(log.range(&key, from));
            }
            Command::Snapshot { key, reply } => {
                let _ = reply.send(log.snapshot(&key));
            }
        }
    }

    tracing::info!(
        "Write serializer stopped ({} partitions owned)",
        log.partition_count()
    );
}
