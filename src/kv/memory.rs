use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use super::{CasOutcome, KvError, KvStore};

/// In-process store. Every operation holds the shard lock for its key, which
/// makes each key linearizable and therefore more than sequentially consistent.
#[derive(Debug, Default)]
pub struct MemoryKv {
    data: DashMap<String, Value>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn compare_and_swap(
        &self,
        key: &str,
        from: Option<Value>,
        to: Value,
        create_if_absent: bool,
    ) -> CasOutcome {
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if from.as_ref() == Some(entry.get()) {
                    entry.insert(to);
                    CasOutcome::Swapped
                } else {
                    CasOutcome::Conflict
                }
            }
            Entry::Vacant(entry) => {
                if create_if_absent && from.is_none() {
                    entry.insert(to);
                    CasOutcome::Swapped
                } else {
                    CasOutcome::Conflict
                }
            }
        }
    }
}

impl KvStore for MemoryKv {
    async fn read(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.put(key, value);
        Ok(())
    }

    async fn cas(
        &self,
        key: &str,
        from: Option<Value>,
        to: Value,
        create_if_absent: bool,
    ) -> Result<CasOutcome, KvError> {
        Ok(self.compare_and_swap(key, from, to, create_if_absent))
    }
}
