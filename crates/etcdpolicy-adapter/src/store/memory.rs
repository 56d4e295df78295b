use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{KeyValue, KvStore, StoreError, StoreResult};

/// In-process store for tests and local tooling.
///
/// Each value is one connection; [`MemoryKvStore::connection`] opens another
/// connection to the same data, so closing one leaves the others usable.
/// Iteration order is unspecified.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, Bytes>>,
    closed: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, open connection sharing this store's data.
    pub fn connection(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            closed: AtomicBool::new(false),
        }
    }

    /// Write raw bytes, bypassing the codec.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get_raw(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KeyValue>> {
        self.ensure_open()?;
        Ok(self
            .entries
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .map(|r| KeyValue {
                key: r.key().clone(),
                value: r.value().clone(),
            })
            .collect())
    }

    async fn get_keys_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self
            .entries
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .map(|r| r.key().clone())
            .collect())
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.ensure_open()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.entries.remove(key).map_or(0, |_| 1))
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        self.ensure_open()?;
        let mut removed = 0u64;
        self.entries.retain(|k, _| {
            let hit = k.starts_with(prefix);
            removed += u64::from(hit);
            !hit
        });
        Ok(removed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
