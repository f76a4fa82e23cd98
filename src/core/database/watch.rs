// src/core/database/watch.rs

//! `WatchRegistry`: the per-database reverse index (key -> watching clients)
//! and per-client forward index (client -> watched keys) that back WATCH's
//! optimistic check-and-set semantics.

use super::transaction::TransactionManager;
use bytes::Bytes;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A watched key: a (database index, key) pair, compared by value. A watch
/// matches on database identity and key-value equality, not key identity.
pub type WatchedKey = (usize, Bytes);

/// Reverse index for a single database: key -> insertion-ordered set of
/// session ids watching it. `IndexSet` gives deterministic iteration order,
/// the same tool this codebase reaches for (`indexmap`) whenever iteration
/// order is part of an observable contract.
type DbWatchers = IndexMap<Bytes, IndexSet<u64>>;

#[derive(Debug, Default)]
pub struct WatchRegistry {
    /// One reverse index per database, guarded independently so WATCH/touch
    /// on db 3 never contends with db 7.
    reverse: Vec<Mutex<DbWatchers>>,
    /// Forward index: session id -> ordered set of watched keys, across all
    /// databases. A single mutex is fine: forward-index operations are O(1)
    /// per call and never held across an await point.
    forward: Mutex<HashMap<u64, IndexSet<WatchedKey>>>,
}

impl WatchRegistry {
    pub fn new(num_databases: usize) -> Self {
        Self {
            reverse: (0..num_databases).map(|_| Mutex::new(IndexMap::new())).collect(),
            forward: Mutex::new(HashMap::new()),
        }
    }

    /// `watch(client, db, key)`: no-op if already watched by this client.
    pub fn watch(&self, session_id: u64, db_index: usize, key: Bytes) {
        let mut forward = self.forward.lock();
        let client_keys = forward.entry(session_id).or_default();
        if !client_keys.insert((db_index, key.clone())) {
            return;
        }
        drop(forward);

        let mut reverse = self.reverse[db_index].lock();
        reverse.entry(key).or_default().insert(session_id);
    }

    /// `unwatch_all(client)`: releases both directions for every key this
    /// session is watching, and clears `DIRTY_CAS` for it (UNWATCH/DISCARD/EXEC
    /// all route through this before clearing transaction state).
    pub fn unwatch_all(&self, session_id: u64) {
        let keys = {
            let mut forward = self.forward.lock();
            forward.remove(&session_id).unwrap_or_default()
        };
        for (db_index, key) in keys {
            let mut reverse = self.reverse[db_index].lock();
            let watchers = reverse
                .get_mut(&key)
                .expect("forward index entry must have a matching reverse watcher list");
            watchers.shift_remove(&session_id);
            if watchers.is_empty() {
                reverse.shift_remove(&key);
            }
        }
    }

    /// `touch(db, key)`: marks every current watcher of `key` as `DIRTY_CAS`.
    /// Does not remove watchers; invalidation is sticky until the client's
    /// transaction state is next cleared.
    pub fn touch(&self, db_index: usize, key: &Bytes, tx_manager: &TransactionManager) {
        let reverse = self.reverse[db_index].lock();
        if reverse.is_empty() {
            return;
        }
        if let Some(watchers) = reverse.get(key) {
            for &session_id in watchers {
                tx_manager.mark_dirty_cas(session_id);
            }
        }
    }

    /// `touch_on_flush(db_index)`: marks `DIRTY_CAS` on every client watching
    /// a key in `db_index` that currently exists. Keys that don't exist are
    /// unaffected; flushing a nonexistent key changes nothing observable.
    /// Must be called *before* the flush actually clears the shards, since
    /// that's when "currently exists" is evaluated.
    pub async fn touch_on_flush_db(
        &self,
        db_index: usize,
        db: &super::core::Db,
        tx_manager: &TransactionManager,
    ) {
        let watched_keys: Vec<Bytes> = {
            let reverse = self.reverse[db_index].lock();
            reverse.keys().cloned().collect()
        };
        for key in watched_keys {
            if db.contains_live_key(&key).await {
                self.touch(db_index, &key, tx_manager);
            }
        }
    }

    /// `touch_on_flush(ALL)`: as above but for every database, used by
    /// FLUSHALL.
    pub async fn touch_on_flush_all(&self, dbs: &[std::sync::Arc<super::core::Db>], tx_manager: &TransactionManager) {
        for (db_index, db) in dbs.iter().enumerate() {
            self.touch_on_flush_db(db_index, db, tx_manager).await;
        }
    }

    /// Same contract as `touch_on_flush_db`, but against shard guards the
    /// caller already holds (e.g. a FLUSHDB replaying inside an EXEC block
    /// that pre-locked every shard for the whole transaction), rather than
    /// locking them itself; the per-shard mutex isn't reentrant.
    pub fn touch_on_flush_db_locked(
        &self,
        db_index: usize,
        guards: &[tokio::sync::MutexGuard<'_, super::shard::ShardCache>],
        db: &super::core::Db,
        tx_manager: &TransactionManager,
    ) {
        let watched_keys: Vec<Bytes> = {
            let reverse = self.reverse[db_index].lock();
            reverse.keys().cloned().collect()
        };
        for key in watched_keys {
            let shard_index = db.get_shard_index(&key);
            let exists = guards[shard_index].get(&key).is_some_and(|v| !v.is_expired());
            if exists {
                self.touch(db_index, &key, tx_manager);
            }
        }
    }

    #[cfg(test)]
    pub fn watcher_count(&self, db_index: usize, key: &Bytes) -> usize {
        self.reverse[db_index]
            .lock()
            .get(key)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn watched_count(&self, session_id: u64) -> usize {
        self.forward
            .lock()
            .get(&session_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_is_idempotent_for_the_same_client() {
        let reg = WatchRegistry::new(1);
        let key = Bytes::from_static(b"k");
        reg.watch(1, 0, key.clone());
        reg.watch(1, 0, key.clone());
        assert_eq!(reg.watcher_count(0, &key), 1);
        assert_eq!(reg.watched_count(1), 1);
    }

    #[test]
    fn multiple_clients_can_watch_the_same_key() {
        let reg = WatchRegistry::new(1);
        let key = Bytes::from_static(b"k");
        reg.watch(1, 0, key.clone());
        reg.watch(2, 0, key.clone());
        assert_eq!(reg.watcher_count(0, &key), 2);
    }

    #[test]
    fn touch_marks_every_current_watcher_dirty() {
        let reg = WatchRegistry::new(1);
        let tx_manager = TransactionManager::new();
        let key = Bytes::from_static(b"k");
        tx_manager.begin(1).unwrap();
        tx_manager.begin(2).unwrap();
        reg.watch(1, 0, key.clone());
        reg.watch(2, 0, key.clone());

        reg.touch(0, &key, &tx_manager);

        assert!(tx_manager.is_dirty_cas(1));
        assert!(tx_manager.is_dirty_cas(2));
    }

    #[test]
    fn touch_on_an_unwatched_key_marks_nobody() {
        let reg = WatchRegistry::new(1);
        let tx_manager = TransactionManager::new();
        tx_manager.begin(1).unwrap();
        reg.watch(1, 0, Bytes::from_static(b"other"));

        reg.touch(0, &Bytes::from_static(b"k"), &tx_manager);

        assert!(!tx_manager.is_dirty_cas(1));
    }

    #[test]
    fn unwatch_all_releases_both_indexes_and_is_eager() {
        let reg = WatchRegistry::new(1);
        let key_a = Bytes::from_static(b"a");
        let key_b = Bytes::from_static(b"b");
        reg.watch(1, 0, key_a.clone());
        reg.watch(1, 0, key_b.clone());

        reg.unwatch_all(1);

        assert_eq!(reg.watched_count(1), 0);
        // The reverse-index entries are reclaimed eagerly, not left as
        // empty sets, once their last watcher leaves.
        assert_eq!(reg.watcher_count(0, &key_a), 0);
        assert_eq!(reg.watcher_count(0, &key_b), 0);
    }

    #[test]
    fn unwatch_all_only_affects_its_own_session() {
        let reg = WatchRegistry::new(1);
        let key = Bytes::from_static(b"k");
        reg.watch(1, 0, key.clone());
        reg.watch(2, 0, key.clone());

        reg.unwatch_all(1);

        assert_eq!(reg.watcher_count(0, &key), 1);
        assert_eq!(reg.watched_count(2), 1);
    }

    #[tokio::test]
    async fn touch_on_flush_db_only_marks_watchers_of_live_keys() {
        use super::super::core::Db;

        let db = Db::new();
        let reg = WatchRegistry::new(1);
        let tx_manager = TransactionManager::new();
        tx_manager.begin(1).unwrap();
        tx_manager.begin(2).unwrap();

        let live_key = Bytes::from_static(b"live");
        let ghost_key = Bytes::from_static(b"ghost");
        {
            let shard_index = db.get_shard_index(&live_key);
            let mut entries = db.get_shard(shard_index).entries.lock().await;
            entries.insert(
                live_key.clone(),
                super::super::shard::StoredValue {
                    data: Bytes::from_static(b"v"),
                    expires_at: None,
                },
            );
        }
        reg.watch(1, 0, live_key.clone());
        reg.watch(2, 0, ghost_key.clone());

        reg.touch_on_flush_db(0, &db, &tx_manager).await;

        assert!(tx_manager.is_dirty_cas(1));
        assert!(!tx_manager.is_dirty_cas(2));
    }
}
