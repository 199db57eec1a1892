//! In-memory store used by tests and local demos.
//!
//! Mirrors the Redis semantics the ledger relies on: missing keys read as
//! empty, type mismatches fail with `WRONGTYPE`. Individual keys can be
//! made to fail, and the whole store can be taken offline, to exercise
//! the degraded read paths.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError};
use crate::domain::RawRecord;

#[derive(Debug, Clone)]
enum Entry {
    Hash(RawRecord),
    Set(BTreeSet<String>),
}

/// Thread-safe in-memory [`KeyValueStore`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    failing_keys: RwLock<HashSet<String>>,
    online: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            failing_keys: RwLock::new(HashSet::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Writes hash fields at `key`, merging with existing fields.
    pub async fn hset<I, K, V>(&self, key: &str, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| -> (String, String) { (k.into(), v.into()) });
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(Entry::Hash(record)) => record.extend(fields),
            _ => {
                entries.insert(key.to_string(), Entry::Hash(fields.collect()));
            }
        }
    }

    /// Adds members to the set at `key`.
    pub async fn sadd<I, M>(&self, key: &str, members: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let members = members.into_iter().map(|m| -> String { m.into() });
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(Entry::Set(set)) => set.extend(members),
            _ => {
                entries.insert(key.to_string(), Entry::Set(members.collect()));
            }
        }
    }

    /// Makes every read of `key` fail.
    pub async fn fail_key(&self, key: &str) {
        self.failing_keys.write().await.insert(key.to_string());
    }

    /// Takes the store offline (`false`) or back online (`true`).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    async fn check(&self, key: &str) -> Result<(), StoreError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        if self.failing_keys.read().await.contains(key) {
            return Err(StoreError::Unavailable(format!("read of {key} failed")));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.check(key).await?;
        match self.entries.read().await.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(Entry::Hash(_)) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<RawRecord, StoreError> {
        self.check(key).await?;
        match self.entries.read().await.get(key) {
            None => Ok(RawRecord::new()),
            Some(Entry::Hash(record)) => Ok(record.clone()),
            Some(Entry::Set(_)) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}
