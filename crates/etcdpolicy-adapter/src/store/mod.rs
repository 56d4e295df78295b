//! Key-value store seam.
//!
//! The adapter only needs prefix reads, single puts and deletes, and prefix
//! deletes. Backends implement [`KvStore`]; the adapter wraps each call with
//! its request timeout and phase context.

pub mod etcd;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use etcd::EtcdKvStore;
pub use memory::MemoryKvStore;

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Bytes,
}

/// Errors reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the request.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A key came back that is not valid UTF-8.
    #[error("non UTF-8 key under {prefix}")]
    InvalidKey { prefix: String },

    /// The connection was already released.
    #[error("store connection is closed")]
    Closed,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Every entry whose key starts with `prefix`.
    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KeyValue>>;

    /// Every key starting with `prefix`, without values.
    async fn get_keys_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Delete one key; returns how many entries were removed (0 or 1).
    async fn delete(&self, key: &str) -> StoreResult<u64>;

    /// Delete every key starting with `prefix`; returns the count removed.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;

    /// Release the connection. Idempotent; later calls fail with
    /// [`StoreError::Closed`].
    fn close(&self);

    fn is_closed(&self) -> bool;
}
