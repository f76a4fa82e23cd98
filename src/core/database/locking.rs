// src/core/database/locking.rs

use super::core::{Db, NUM_SHARDS};
use super::shard::ShardCache;
use crate::core::Command;
use crate::core::commands::command_trait::CommandExt;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::MutexGuard;

/// Holds the `MutexGuard`s required to execute a command, so the execution
/// layer doesn't need to know which locking strategy applies to which command.
pub enum ExecutionLocks<'a> {
    Single {
        shard_index: usize,
        guard: MutexGuard<'a, ShardCache>,
    },
    Multi {
        guards: BTreeMap<usize, MutexGuard<'a, ShardCache>>,
    },
    All {
        guards: Vec<MutexGuard<'a, ShardCache>>,
    },
    None,
}

impl Db {
    /// Determines and acquires the appropriate locks for a command based on
    /// the keys it touches.
    pub async fn determine_locks_for_command<'a>(&'a self, command: &Command) -> ExecutionLocks<'a> {
        let keys = command.get_keys();
        match command {
            // FLUSHDB and FLUSHALL handle their own locking: they must call
            // `touch_on_flush` (which takes its own momentary shard locks to
            // check key existence) *before* acquiring the full-database lock
            // set used to actually clear the shards. Pre-acquiring `All` here
            // would deadlock against that check, since the shard mutex isn't
            // reentrant.
            Command::FlushDb(_) => ExecutionLocks::None,
            Command::FlushAll(_) => ExecutionLocks::None,
            _ if keys.len() > 1 => ExecutionLocks::Multi {
                guards: self.lock_shards_for_keys(&keys).await,
            },
            _ if keys.len() == 1 => {
                let shard_index = self.get_shard_index(&keys[0]);
                ExecutionLocks::Single {
                    shard_index,
                    guard: self.get_shard(shard_index).entries.lock().await,
                }
            }
            _ => ExecutionLocks::None,
        }
    }

    /// Locks multiple shards, sorting indices first to keep a consistent
    /// acquisition order across callers and avoid deadlocks.
    pub async fn lock_shards_for_keys<'a>(
        &'a self,
        keys: &[Bytes],
    ) -> BTreeMap<usize, MutexGuard<'a, ShardCache>> {
        let indices: BTreeSet<usize> = keys.iter().map(|key| self.get_shard_index(key)).collect();
        let mut guards = BTreeMap::new();
        for index in indices {
            guards.insert(index, self.shards[index].entries.lock().await);
        }
        guards
    }

    /// Locks all shards, in a fixed order, to give a transaction or FLUSHDB a
    /// consistent snapshot of this database.
    pub async fn lock_all_shards<'a>(&'a self) -> Vec<MutexGuard<'a, ShardCache>> {
        let mut guards = Vec::with_capacity(NUM_SHARDS);
        for i in 0..NUM_SHARDS {
            guards.push(self.shards[i].entries.lock().await);
        }
        guards
    }
}
