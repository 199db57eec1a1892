//! Key-value store boundary.
//!
//! The ledger only ever reads. [`KeyValueStore`] exposes the three
//! commands it needs; [`RedisStore`] talks to the production Redis and
//! [`MemoryStore`] backs tests and local demos.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use crate::domain::RawRecord;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Error reported by the Redis client.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The key holds a value of another type.
    #[error("WRONGTYPE operation against key {0}")]
    WrongType(String),
}

/// Read interface of the key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Members of the set at `key`; empty when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the read fails.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Fields of the hash at `key`; empty when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the read fails.
    async fn hgetall(&self, key: &str) -> Result<RawRecord, StoreError>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store does not answer.
    async fn ping(&self) -> Result<(), StoreError>;
}
