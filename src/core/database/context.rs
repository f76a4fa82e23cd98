// src/core/database/context.rs

use super::core::Db;
use super::locking::ExecutionLocks;
use super::shard::ShardCache;
use crate::core::state::ServerState;
use crate::core::{Command, DbError};
use std::sync::Arc;
use tokio::sync::MutexGuard;

/// Everything a command needs to execute: server-wide state, the shard
/// lock(s) it was granted, and which database/session it's running against.
pub struct ExecutionContext<'a> {
    pub state: Arc<ServerState>,
    pub locks: ExecutionLocks<'a>,
    pub db: &'a Db,
    pub db_index: usize,
    pub command: Option<Command>,
    pub session_id: u64,
    /// True while replaying a queued command inside EXEC. Propagation and
    /// locking still behave normally; this only affects diagnostics (the
    /// slow log still records every completed command execution, queued or
    /// not).
    pub in_exec: bool,
}

impl<'a> ExecutionContext<'a> {
    /// Returns the single shard lock for the command's (sole) key.
    pub fn single_shard_mut(&mut self) -> Result<&mut ShardCache, DbError> {
        let key = self
            .command
            .as_ref()
            .and_then(|c| c.get_keys().into_iter().next())
            .ok_or_else(|| DbError::Internal("command has no key for shard lookup".into()))?;
        let shard_index = self.db.get_shard_index(&key);
        match &mut self.locks {
            ExecutionLocks::Single { guard, .. } => Ok(guard),
            ExecutionLocks::Multi { guards } => guards
                .get_mut(&shard_index)
                .map(|g: &mut MutexGuard<'a, ShardCache>| &mut **g)
                .ok_or_else(|| DbError::Internal("required shard lock missing".into())),
            // Held when this command is replaying inside an EXEC block that
            // also queued a FLUSHDB/FLUSHALL: the transaction pre-locked
            // every shard up front, so index straight into it rather than
            // re-locking (the per-shard mutex isn't reentrant).
            ExecutionLocks::All { guards } => guards
                .get_mut(shard_index)
                .ok_or_else(|| DbError::Internal("required shard lock missing".into())),
            ExecutionLocks::None => Err(DbError::Internal("command expected a shard lock".into())),
        }
    }

    pub fn release_locks(&mut self) {
        self.locks = ExecutionLocks::None;
    }
}
