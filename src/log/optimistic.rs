//! Optimistic Appender
//!
//! The leaderless way of appending: read the partition from the store, push
//! the value, and compare-and-swap the result back, starting over whenever
//! another writer got there first. No routing is involved and every node
//! can append to every partition, at the cost of one store round trip per
//! attempt and unbounded retries under contention.
//!
//! A cluster runs either this strategy or leader routing, never both: a
//! leader persisting with blind writes would overwrite CAS appends.

use std::sync::Arc;
use std::time::Duration;

use super::durability::{decode_entries, partition_store_key};
use super::error::LogResult;
use crate::kv::{CasOutcome, KvStore};

const MAX_BACKOFF_MS: u64 = 64;

pub struct OptimisticAppender<S> {
    store: Arc<S>,
}

impl<S: KvStore> OptimisticAppender<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn append(&self, key: &str, value: i64) -> LogResult<u64> {
        let store_key = partition_store_key(key);
        let mut backoff_ms = 1u64;
        let mut conflicts = 0u64;

        loop {
            let current = self.store.read(&store_key).await?;
            let mut entries = decode_entries(key, current.clone())?;
            entries.push(value);
            let offset = (entries.len() - 1) as u64;

            match self
                .store
                .cas(&store_key, current, serde_json::Value::from(entries), true)
                .await?
            {
                CasOutcome::Swapped => {
                    if conflicts > 0 {
                        tracing::debug!("Appended to {} after {} conflicts", key, conflicts);
                    }
                    return Ok(offset);
                }
                CasOutcome::Conflict => {
                    conflicts += 1;
                    let jitter = rand::random::<u64>() % (backoff_ms + 1);
                    tokio::time::sleep(Duration::from_millis(backoff_ms + jitter)).await;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
            }
        }
    }

    pub async fn read(&self, key: &str) -> LogResult<Vec<i64>> {
        let value = self.store.read(&partition_store_key(key)).await?;
        decode_entries(key, value)
    }
}
