// src/core/database/core.rs

use super::shard::DbShard;
use bytes::Bytes;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// The number of shards per database. Kept small and fixed rather than
/// configurable.
pub const NUM_SHARDS: usize = 16;

/// `Db` represents a single selectable database (as in Redis's numbered
/// databases), composed of multiple `DbShard`s. `Db` holds only the
/// keyspace; transaction state and watch bookkeeping live on `ServerState`
/// since both are scoped to a *session*, not a database.
#[derive(Debug)]
pub struct Db {
    pub shards: Vec<Arc<DbShard>>,
}

impl Db {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Arc::new(DbShard::new())).collect();
        Self { shards }
    }

    pub fn get_shard_index(&self, key: &Bytes) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    pub fn get_shard(&self, index: usize) -> &Arc<DbShard> {
        &self.shards[index]
    }

    pub fn get_key_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.key_count.load(Ordering::Relaxed) as usize)
            .sum()
    }

    /// Checks whether `key` is present (and unexpired) without taking any
    /// transaction-level lock. Used by `touch_on_flush` to decide whether a
    /// flush actually observably affects a given watched key.
    pub async fn contains_live_key(&self, key: &Bytes) -> bool {
        let idx = self.get_shard_index(key);
        let guard = self.shards[idx].entries.lock().await;
        guard.get(key).is_some_and(|v| !v.is_expired())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}
