use std::collections::HashMap;
use std::sync::Arc;

use super::error::{LogError, LogResult};

/// Maximum number of entries a single poll returns per key.
pub const POLL_PAGE_SIZE: usize = 100;

/// `(offset, value)`, serialized as a two-element JSON array.
pub type Entry = (u64, i64);

/// Authoritative in-memory sequences of the partitions this node owns.
///
/// Not synchronized: the write serializer owns the only instance and is the
/// only code that touches it. Sequences are shared copy-on-write with the
/// snapshots handed out for persistence; an append copies a sequence only
/// while a snapshot of it is still held elsewhere.
#[derive(Debug, Default)]
pub struct PartitionLog {
    partitions: HashMap<String, Arc<Vec<i64>>>,
}

impl PartitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its offset.
    pub fn append(&mut self, key: &str, value: i64) -> u64 {
        let entries = Arc::make_mut(self.partitions.entry(key.to_string()).or_default());
        entries.push(value);
        (entries.len() - 1) as u64
    }

    pub fn entries(&self, key: &str) -> &[i64] {
        self.partitions.get(key).map(|entries| entries.as_slice()).unwrap_or(&[])
    }

    /// Current sequence of `key`, shared without copying.
    pub fn snapshot(&self, key: &str) -> Arc<Vec<i64>> {
        self.partitions.get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.entries(key).len()
    }

    pub fn range(&self, key: &str, from: i64) -> LogResult<Vec<Entry>> {
        read_page(key, self.entries(key), from)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

/// Returns the entries at `[from, min(len, from + POLL_PAGE_SIZE))`.
///
/// `from == len` is valid and yields an empty page; anything below zero or
/// past the end is out of range.
pub fn read_page(key: &str, entries: &[i64], from: i64) -> LogResult<Vec<Entry>> {
    let len = entries.len();
    if from < 0 || from as u64 > len as u64 {
        return Err(LogError::OffsetOutOfRange {
            key: key.to_string(),
            offset: from,
            len,
        });
    }

    let start = from as usize;
    let end = len.min(start + POLL_PAGE_SIZE);

    Ok(entries[start..end]
        .iter()
        .enumerate()
        .map(|(i, value)| ((start + i) as u64, *value))
        .collect())
}
