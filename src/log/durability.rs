//! Durability Adapter
//!
//! Persists owned partitions to the shared store and reads partitions owned
//! by peers back out of it. Every persist writes the whole sequence under
//! the partition's store key: the store has no range append, and the owner's
//! in-memory copy stays authoritative for its own reads.
//!
//! Persistence runs on its own task. The write serializer only marks a
//! partition dirty after an append; the persister takes the dirty set, asks
//! the serializer for each partition's current snapshot and writes it. Many
//! appends between two persists collapse into one write, and the serializer
//! never copies a sequence on the append path.
//!
//! A peer reading through `read_remote` sees the last snapshot that reached
//! the store, which can trail acknowledged appends.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::error::{LogError, LogResult};
use super::serializer::WriteSerializer;
use crate::kv::KvStore;

const PARTITION_KEY_PREFIX: &str = "log/";
/// Pause after a round with failed writes. Store writes carry no timeout
/// (see `HttpKv::write`), so a retry never races an earlier write of the
/// same partition.
const PERSIST_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Store key under which a partition's snapshot lives.
pub fn partition_store_key(key: &str) -> String {
    format!("{}{}", PARTITION_KEY_PREFIX, key)
}

/// Decodes a stored snapshot; a missing value is an empty partition.
pub fn decode_entries(key: &str, value: Option<Value>) -> LogResult<Vec<i64>> {
    match value {
        Some(value) => serde_json::from_value(value).map_err(|source| LogError::CorruptState {
            key: key.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Partitions appended to since their last successful persist.
#[derive(Debug, Default)]
pub struct DirtyPartitions {
    keys: Mutex<HashSet<String>>,
    notify: Notify,
}

impl DirtyPartitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never blocks on the store.
    pub fn mark(&self, key: &str) {
        let mut keys = self.lock();
        if !keys.contains(key) {
            keys.insert(key.to_string());
        }
        drop(keys);
        self.notify.notify_one();
    }

    /// Waits until at least one partition is dirty and takes all of them.
    pub async fn take(&self) -> HashSet<String> {
        loop {
            let keys = self.drain();
            if !keys.is_empty() {
                return keys;
            }
            self.notify.notified().await;
        }
    }

    /// Takes whatever is dirty right now, possibly nothing.
    pub fn drain(&self) -> HashSet<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set holds plain data, a panic elsewhere cannot leave it half-updated.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct DurabilityAdapter<S> {
    store: Arc<S>,
    dirty: Arc<DirtyPartitions>,
    shutdown: Notify,
}

impl<S: KvStore> DurabilityAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            dirty: Arc::new(DirtyPartitions::new()),
            shutdown: Notify::new(),
        }
    }

    pub fn dirty(&self) -> Arc<DirtyPartitions> {
        self.dirty.clone()
    }

    /// Writes the whole partition under its store key.
    pub async fn persist(&self, key: &str, entries: &[i64]) -> LogResult<()> {
        self.store
            .write(&partition_store_key(key), Value::from(entries))
            .await?;
        Ok(())
    }

    /// Last persisted snapshot of a partition this node does not own.
    pub async fn read_remote(&self, key: &str) -> LogResult<Vec<i64>> {
        let value = self.store.read(&partition_store_key(key)).await?;
        decode_entries(key, value)
    }

    /// Starts the task that persists dirty partitions, reading their
    /// snapshots from `source`.
    pub fn spawn_persister(self: &Arc<Self>, source: WriteSerializer) -> tokio::task::JoinHandle<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            adapter.persist_loop(source).await;
        })
    }

    /// Asks the persister to finish: the write in flight completes, every
    /// partition still dirty is persisted once, then the task returns.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    async fn persist_loop(&self, source: WriteSerializer) {
        tracing::info!("Snapshot persister started");

        loop {
            let keys = tokio::select! {
                keys = self.dirty.take() => keys,
                _ = self.shutdown.notified() => break,
            };

            if !self.persist_keys(&source, keys).await {
                tokio::time::sleep(PERSIST_RETRY_DELAY).await;
            }
        }

        let keys = self.dirty.drain();
        let flushed = keys.len();
        if !self.persist_keys(&source, keys).await {
            tracing::warn!("Some partitions were not persisted before shutdown");
        }
        tracing::info!("Snapshot persister stopped ({} partitions flushed)", flushed);
    }

    /// Persists the current snapshot of each key. Failed keys are marked
    /// dirty again; returns whether every write succeeded.
    async fn persist_keys(&self, source: &WriteSerializer, keys: HashSet<String>) -> bool {
        let mut all_persisted = true;

        for key in keys {
            let result = match source.snapshot(key.clone()).await {
                Ok(entries) => self.persist(&key, &entries).await.map(|()| entries.len()),
                Err(e) => Err(e),
            };

            match result {
                Ok(len) => {
                    tracing::trace!("Persisted partition {} ({} entries)", key, len);
                }
                Err(e) => {
                    tracing::warn!("Failed to persist partition {}: {}", key, e);
                    self.dirty.mark(&key);
                    all_persisted = false;
                }
            }
        }

        all_persisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryKv;
    use crate::kv::{CasOutcome, KvError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Rejects the first `failures` writes, then behaves like `MemoryKv`.
    struct FlakyKv {
        inner: MemoryKv,
        failures: AtomicUsize,
        writes: AtomicUsize,
    }

    impl FlakyKv {
        fn new(failures: usize) -> Self {
            Self {
                inner: MemoryKv::new(),
                failures: AtomicUsize::new(failures),
                writes: AtomicUsize::new(0),
            }
        }
    }

    impl KvStore for FlakyKv {
        async fn read(&self, key: &str) -> Result<Option<Value>, KvError> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: Value) -> Result<(), KvError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(KvError::Status(503));
            }
            self.inner.write(key, value).await
        }

        async fn cas(
            &self,
            key: &str,
            from: Option<Value>,
            to: Value,
            create_if_absent: bool,
        ) -> Result<CasOutcome, KvError> {
            self.inner.cas(key, from, to, create_if_absent).await
        }
    }

    async fn wait_for(store: &MemoryKv, key: &str, expected: Value) {
        for _ in 0..200 {
            if store.get(key) == Some(expected.clone()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} never became {}", key, expected);
    }

    /// Adapter plus a running serializer feeding it, persister not started.
    fn pipeline<S: KvStore>(store: Arc<S>) -> (Arc<DurabilityAdapter<S>>, WriteSerializer) {
        let adapter = Arc::new(DurabilityAdapter::new(store));
        let (serializer, _actor) = WriteSerializer::spawn(16, adapter.dirty());
        (adapter, serializer)
    }

    #[test]
    fn test_marks_collapse_per_partition() {
        let dirty = DirtyPartitions::new();

        dirty.mark("a");
        dirty.mark("a");
        dirty.mark("b");

        assert_eq!(dirty.pending_len(), 2);
    }

    #[tokio::test]
    async fn test_take_returns_all_dirty_keys() {
        let dirty = DirtyPartitions::new();
        dirty.mark("a");
        dirty.mark("b");

        let keys = dirty.take().await;

        assert_eq!(keys, HashSet::from(["a".to_string(), "b".to_string()]));
        assert_eq!(dirty.pending_len(), 0);
        assert!(dirty.drain().is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_read_remote() {
        let store = Arc::new(MemoryKv::new());
        let adapter = DurabilityAdapter::new(store.clone());

        adapter.persist("p", &[10, 20]).await.unwrap();

        assert_eq!(store.get("log/p"), Some(json!([10, 20])));
        assert_eq!(adapter.read_remote("p").await.unwrap(), vec![10, 20]);
    }

    #[tokio::test]
    async fn test_read_remote_missing_partition_is_empty() {
        let adapter = DurabilityAdapter::new(Arc::new(MemoryKv::new()));
        assert!(adapter.read_remote("never-written").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_remote_corrupt_value() {
        let store = Arc::new(MemoryKv::new());
        store.put("log/p", json!("not a list"));
        let adapter = DurabilityAdapter::new(store);

        assert!(matches!(
            adapter.read_remote("p").await,
            Err(LogError::CorruptState { .. })
        ));
    }

    #[tokio::test]
    async fn test_persister_writes_appended_partitions() {
        let store = Arc::new(MemoryKv::new());
        let (adapter, serializer) = pipeline(store.clone());
        let handle = adapter.spawn_persister(serializer.clone());

        for v in [1, 2, 3] {
            serializer.append("p".into(), v).await.unwrap();
        }

        wait_for(&store, "log/p", json!([1, 2, 3])).await;
        handle.abort();
    }

    #[tokio::test]
    async fn test_persister_retries_after_store_failure() {
        let store = Arc::new(FlakyKv::new(2));
        let (adapter, serializer) = pipeline(store.clone());
        let handle = adapter.spawn_persister(serializer.clone());

        serializer.append("p".into(), 4).await.unwrap();
        serializer.append("p".into(), 5).await.unwrap();

        wait_for(&store.inner, "log/p", json!([4, 5])).await;
        assert!(store.writes.load(Ordering::SeqCst) >= 3);
        handle.abort();
    }

    #[tokio::test]
    async fn test_stop_flushes_dirty_partitions() {
        let store = Arc::new(MemoryKv::new());
        let (adapter, serializer) = pipeline(store.clone());

        serializer.append("a".into(), 1).await.unwrap();
        serializer.append("b".into(), 2).await.unwrap();
        // Round trip through the inbox so both marks have happened.
        serializer.range("b".into(), 0).await.unwrap();

        // Stop before the task ever runs. The stop permit is kept, and the
        // task returns only after both partitions are written.
        adapter.stop();
        adapter.spawn_persister(serializer.clone()).await.unwrap();

        assert_eq!(store.get("log/a"), Some(json!([1])));
        assert_eq!(store.get("log/b"), Some(json!([2])));
        assert_eq!(adapter.dirty().pending_len(), 0);
    }
}
