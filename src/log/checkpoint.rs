use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{LogError, LogResult};
use crate::kv::KvStore;

const CHECKPOINT_KEY_PREFIX: &str = "offset/";

/// Store key of one client's committed offset for one partition.
pub fn checkpoint_store_key(client: &str, key: &str) -> String {
    format!("{}{}/{}", CHECKPOINT_KEY_PREFIX, client, key)
}

/// Per-client committed offsets.
///
/// Not routed by partition ownership: whichever node receives a commit
/// writes it to the shared store, and any node can answer a later list.
pub struct OffsetCheckpointStore<S> {
    store: Arc<S>,
}

impl<S: KvStore> OffsetCheckpointStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Writes each `(client, key) -> offset` pair independently, one after
    /// the other.
    pub async fn commit(&self, client: &str, offsets: &HashMap<String, u64>) -> LogResult<()> {
        for (key, offset) in offsets {
            self.store
                .write(&checkpoint_store_key(client, key), Value::from(*offset))
                .await?;
            tracing::debug!("Committed {}:{} -> {}", client, key, offset);
        }
        Ok(())
    }

    /// Committed offset of every requested key, 0 for keys never committed.
    pub async fn list(&self, client: &str, keys: &[String]) -> LogResult<HashMap<String, u64>> {
        let mut offsets = HashMap::with_capacity(keys.len());

        for key in keys {
            let offset = match self.store.read(&checkpoint_store_key(client, key)).await? {
                Some(value) => serde_json::from_value(value).map_err(|source| {
                    LogError::CorruptState {
                        key: key.clone(),
                        source,
                    }
                })?,
                None => 0,
            };
            offsets.insert(key.clone(), offset);
        }

        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryKv;
    use serde_json::json;

    fn offsets(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_commit_then_list() {
        let checkpoints = OffsetCheckpointStore::new(Arc::new(MemoryKv::new()));

        checkpoints.commit("c1", &offsets(&[("k", 5)])).await.unwrap();

        let listed = checkpoints.list("c1", &["k".to_string()]).await.unwrap();
        assert_eq!(listed, offsets(&[("k", 5)]));
    }

    #[tokio::test]
    async fn test_unknown_key_defaults_to_zero() {
        let checkpoints = OffsetCheckpointStore::new(Arc::new(MemoryKv::new()));

        let listed = checkpoints
            .list("c1", &["never".to_string(), "seen".to_string()])
            .await
            .unwrap();

        assert_eq!(listed, offsets(&[("never", 0), ("seen", 0)]));
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        let checkpoints = OffsetCheckpointStore::new(Arc::new(MemoryKv::new()));

        checkpoints.commit("c1", &offsets(&[("k", 3)])).await.unwrap();
        checkpoints.commit("c2", &offsets(&[("k", 8)])).await.unwrap();

        let keys = ["k".to_string()];
        assert_eq!(checkpoints.list("c1", &keys).await.unwrap()["k"], 3);
        assert_eq!(checkpoints.list("c2", &keys).await.unwrap()["k"], 8);
    }

    #[tokio::test]
    async fn test_recommit_overwrites() {
        let checkpoints = OffsetCheckpointStore::new(Arc::new(MemoryKv::new()));

        checkpoints.commit("c1", &offsets(&[("a", 1), ("b", 2)])).await.unwrap();
        checkpoints.commit("c1", &offsets(&[("a", 7)])).await.unwrap();

        let listed = checkpoints
            .list("c1", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(listed, offsets(&[("a", 7), ("b", 2)]));
    }

    #[tokio::test]
    async fn test_checkpoint_keys_do_not_collide_with_partitions() {
        let store = Arc::new(MemoryKv::new());
        let checkpoints = OffsetCheckpointStore::new(store.clone());

        checkpoints.commit("c1", &offsets(&[("k", 4)])).await.unwrap();

        assert_eq!(store.get("offset/c1/k"), Some(json!(4)));
        assert_eq!(store.get("log/c1k"), None);
    }
}
