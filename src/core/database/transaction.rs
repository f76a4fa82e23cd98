// src/core/database/transaction.rs

//! Per-session transaction state: the queued-command buffer and the dirty
//! flag set (`IN_MULTI`, `DIRTY_CAS`, `DIRTY_EXEC`) that the EXEC algorithm
//! consults to decide whether a transaction may safely commit.

use crate::core::Command;
use crate::core::DbError;
use crate::core::commands::command_trait::{CommandExt, CommandFlags};
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

/// A single enqueued command: the parsed `cmd_descriptor` plus its own owned
/// argv, exactly as handed to `enqueue`. Kept separate from `Command` itself
/// because the slow log and replication propagation both want the original
/// wire-level argv (including the command name), not just the parsed fields.
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub command: Command,
    pub argv: Vec<Bytes>,
}

/// Represents the state of an ongoing transaction for a specific session.
#[derive(Debug, Default, Clone)]
pub struct TransactionState {
    pub queue: Vec<QueuedCommand>,
    pub cmd_flags_union: CommandFlags,
    /// `IN_MULTI`: a transaction is currently open for this session.
    pub in_multi: bool,
    /// `DIRTY_CAS`: a watched key was touched since WATCH.
    pub dirty_cas: bool,
    /// `DIRTY_EXEC`: a command failed to enqueue (unknown command, bad arity).
    pub dirty_exec: bool,
}

impl TransactionState {
    fn reset_flags(&mut self) {
        self.queue.clear();
        self.cmd_flags_union = CommandFlags::empty();
        self.in_multi = false;
        self.dirty_cas = false;
        self.dirty_exec = false;
    }
}

/// Owns every session's `TransactionState`, keyed by session id. Kept separate
/// from the keyspace (`Db`) because a transaction is scoped to a session, not
/// to the database that session currently has selected.
#[derive(Debug, Default)]
pub struct TransactionManager {
    states: DashMap<u64, TransactionState>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `begin(client)`: fails with *Nested* if already `IN_MULTI`.
    pub fn begin(&self, session_id: u64) -> Result<(), DbError> {
        let mut state = self.states.entry(session_id).or_default();
        if state.in_multi {
            return Err(DbError::InvalidState(
                "MULTI calls can not be nested".to_string(),
            ));
        }
        // No other flags are cleared here: a DIRTY_CAS set by a prior WATCH
        // must persist across the MULTI boundary.
        state.in_multi = true;
        debug!(session_id, "MULTI: transaction started");
        Ok(())
    }

    /// `enqueue(client)`: precondition `IN_MULTI`. Appends a copy of the
    /// current command slot (descriptor + argv) and folds its flags into
    /// `cmd_flags_union`.
    pub fn enqueue(&self, session_id: u64, command: Command, argv: Vec<Bytes>) -> Result<(), DbError> {
        let mut state =
            self.states
                .get_mut(&session_id)
                .ok_or_else(|| DbError::InvalidState("no active transaction".to_string()))?;
        if !state.in_multi {
            return Err(DbError::InvalidState("no active transaction".to_string()));
        }
        state.cmd_flags_union |= command.get_flags();
        state.queue.push(QueuedCommand { command, argv });
        debug!(session_id, "queued command in transaction");
        Ok(())
    }

    /// `flag_error(client)`: idempotently sets `DIRTY_EXEC` if `IN_MULTI`.
    pub fn flag_error(&self, session_id: u64) {
        if let Some(mut state) = self.states.get_mut(&session_id)
            && state.in_multi
        {
            state.dirty_exec = true;
        }
    }

    /// `discard(client)`: fails with *NoMulti* if not `IN_MULTI`. Clearing the
    /// watch side is the caller's responsibility (it needs the registry).
    pub fn discard(&self, session_id: u64) -> Result<(), DbError> {
        let mut state = self
            .states
            .get_mut(&session_id)
            .filter(|s| s.in_multi)
            .ok_or_else(|| DbError::InvalidState("DISCARD without MULTI".to_string()))?;
        state.reset_flags();
        debug!(session_id, "transaction discarded");
        Ok(())
    }

    /// Clears all transaction state for a session unconditionally, used by EXEC
    /// (after it has already validated `IN_MULTI`) and by client disconnect.
    pub fn reset(&self, session_id: u64) {
        if let Some(mut state) = self.states.get_mut(&session_id) {
            state.reset_flags();
        }
    }

    pub fn is_in_multi(&self, session_id: u64) -> bool {
        self.states.get(&session_id).is_some_and(|s| s.in_multi)
    }

    pub fn is_dirty_exec(&self, session_id: u64) -> bool {
        self.states.get(&session_id).is_some_and(|s| s.dirty_exec)
    }

    pub fn is_dirty_cas(&self, session_id: u64) -> bool {
        self.states.get(&session_id).is_some_and(|s| s.dirty_cas)
    }

    pub fn mark_dirty_cas(&self, session_id: u64) {
        if let Some(mut state) = self.states.get_mut(&session_id) {
            state.dirty_cas = true;
        }
    }

    /// Clears `DIRTY_CAS` only. UNWATCH does not clear `DIRTY_EXEC`; that
    /// asymmetry is intentional, not an oversight.
    pub fn clear_dirty_cas(&self, session_id: u64) {
        if let Some(mut state) = self.states.get_mut(&session_id) {
            state.dirty_cas = false;
        }
    }

    pub fn cmd_flags_union(&self, session_id: u64) -> CommandFlags {
        self.states
            .get(&session_id)
            .map(|s| s.cmd_flags_union)
            .unwrap_or(CommandFlags::empty())
    }

    /// Takes and removes the full transaction state, used by EXEC once it has
    /// decided to commit, so the handler can iterate the queue without
    /// holding the DashMap shard lock for the whole replay.
    pub fn take(&self, session_id: u64) -> Option<TransactionState> {
        self.states.remove(&session_id).map(|(_, v)| v)
    }

    /// Drops any transaction state for a session entirely, e.g. on disconnect.
    pub fn remove(&self, session_id: u64) {
        self.states.remove(&session_id);
    }
}
