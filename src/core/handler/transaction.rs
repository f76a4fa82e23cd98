// src/core/handler/transaction.rs

//! Drives the actual MULTI/DISCARD/WATCH/UNWATCH/EXEC semantics described in
//! spec.md §4.1/§4.2/§4.4, on top of the `TransactionManager` and
//! `WatchRegistry` primitives. Grounded on
//! `spineldb::core::handler::transaction_handler::TransactionHandler`'s
//! shape (a handful of free functions operating on `ServerState` plus a
//! session id, rather than that struct's per-call `&'a Arc<Db>` borrow,
//! since this crate's EXEC also needs to reach across every database for
//! the read-only-replica check and the flush-invalidation hooks).

use super::dispatch::{execute_queued, record_slowlog};
use crate::connection::Session;
use crate::core::Command;
use crate::core::commands::command_trait::{CommandExt, CommandFlags};
use crate::core::database::ExecutionLocks;
use crate::core::protocol::RespValue;
use crate::core::replication::ReplicationRole;
use crate::core::state::ServerState;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// `MULTI`: fails with *Nested* if the client is already `IN_MULTI`.
pub fn handle_multi(state: &Arc<ServerState>, session_id: u64) -> RespValue {
    match state.tx_manager.begin(session_id) {
        Ok(()) => RespValue::ok(),
        Err(e) => RespValue::Error(e.to_string()),
    }
}

/// `DISCARD`: fails with *NoMulti* if the client is not `IN_MULTI`.
/// Releases the queue, clears all three flags, and unwatches every key.
/// A client leaving DISCARD is in exactly the state it was in before MULTI.
pub fn handle_discard(state: &Arc<ServerState>, session_id: u64) -> RespValue {
    match state.tx_manager.discard(session_id) {
        Ok(()) => {
            state.watch_registry.unwatch_all(session_id);
            RespValue::ok()
        }
        Err(e) => RespValue::Error(e.to_string()),
    }
}

/// `WATCH key [key ...]`: rejected outright if the client is `IN_MULTI`.
/// This is a protocol-misuse error, not a queueing-time one, so it does not
/// set `DIRTY_EXEC`.
pub fn handle_watch(state: &Arc<ServerState>, session_id: u64, db_index: usize, keys: Vec<Bytes>) -> RespValue {
    if state.tx_manager.is_in_multi(session_id) {
        return RespValue::Error("ERR WATCH inside MULTI is not allowed".to_string());
    }
    for key in keys {
        state.watch_registry.watch(session_id, db_index, key);
    }
    RespValue::ok()
}

/// `UNWATCH`: unconditional. Clears `DIRTY_CAS` but deliberately leaves
/// `DIRTY_EXEC` alone: queueing-time errors are not forgiven by UNWATCH.
pub fn handle_unwatch(state: &Arc<ServerState>, session_id: u64) -> RespValue {
    state.watch_registry.unwatch_all(session_id);
    state.tx_manager.clear_dirty_cas(session_id);
    RespValue::ok()
}

/// Discards the pending transaction and notifies MONITOR, the common tail
/// of every EXEC early-return path (steps 2, 3, and 4 of the algorithm).
fn abort(state: &Arc<ServerState>, session: &Session) {
    state.tx_manager.reset(session.session_id);
    state.watch_registry.unwatch_all(session.session_id);
    state.monitor.notify(session.session_id, session.db_index, "EXEC");
}

/// `EXEC`: the full commit algorithm from spec.md §4.1.
pub async fn handle_exec(state: &Arc<ServerState>, session: &Session) -> RespValue {
    let session_id = session.session_id;
    let db_index = session.db_index;

    // Step 1.
    if !state.tx_manager.is_in_multi(session_id) {
        return RespValue::Error("ERR EXEC without MULTI".to_string());
    }

    // Step 2.
    if state.tx_manager.is_dirty_exec(session_id) {
        abort(state, session);
        return RespValue::Error(
            "EXECABORT Transaction discarded because of previous errors.".to_string(),
        );
    }

    // Step 3.
    if state.tx_manager.is_dirty_cas(session_id) {
        abort(state, session);
        return RespValue::NullArray;
    }

    // Step 4: a read-only replica rejects a block containing any write.
    let cmd_flags = state.tx_manager.cmd_flags_union(session_id);
    if cmd_flags.contains(CommandFlags::WRITE) && state.replication.rejects_writes(session.is_master_link) {
        abort(state, session);
        return RespValue::Error(
            "ERR Transaction contains write commands but instance is now a read-only slave. EXEC aborted.".to_string(),
        );
    }

    // Step 5: unwatch before replay. Later touches can no longer affect
    // this commit, so there's no reason to keep paying their invalidation
    // cost.
    state.watch_registry.unwatch_all(session_id);

    let Some(tx_state) = state.tx_manager.take(session_id) else {
        // IN_MULTI was just observed true; only this session's own command
        // loop can clear it, and that loop is single-threaded per session.
        unreachable!("IN_MULTI implies a TransactionState exists for this session");
    };

    let Some(db) = state.get_db(db_index) else {
        return RespValue::Error(format!("ERR DB index {db_index} out of range"));
    };

    // Acquire every lock the block will need up front and hold it for the
    // full replay below, so the transaction is atomic from any other
    // client's perspective: no command from another session can observe a
    // partially-applied block. A queued FLUSHDB/FLUSHALL touches the whole
    // keyspace regardless of its (empty) key list, so it forces a full-db
    // lock for the entire block rather than just the keys named by get_keys.
    let needs_full_lock = tx_state
        .queue
        .iter()
        .any(|q| matches!(q.command, Command::FlushDb(_) | Command::FlushAll(_)));
    let mut locks = if needs_full_lock {
        ExecutionLocks::All {
            guards: db.lock_all_shards().await,
        }
    } else {
        let mut all_keys: Vec<Bytes> = tx_state.queue.iter().flat_map(|q| q.command.get_keys()).collect();
        all_keys.sort_unstable();
        all_keys.dedup();
        if all_keys.is_empty() {
            ExecutionLocks::None
        } else {
            ExecutionLocks::Multi {
                guards: db.lock_shards_for_keys(&all_keys).await,
            }
        }
    };

    // Steps 6-8: replay the queue in order, installing each queued command
    // into the "current slot" (here, just the loop variable) in turn.
    let mut responses = Vec::with_capacity(tx_state.queue.len());
    let mut multi_propagated = false;
    let mut total_dirty: u64 = 0;
    let role_before_block = state.replication.role();

    for queued in tx_state.queue {
        if !multi_propagated
            && !queued
                .command
                .get_flags()
                .intersects(CommandFlags::READONLY | CommandFlags::ADMIN)
        {
            state.replication.propagate_synthetic_multi(db_index);
            multi_propagated = true;
        }

        let start = Instant::now();
        let (reply, outcome) =
            execute_queued(state, session_id, &db, db_index, &queued.command, &mut locks).await;
        record_slowlog(state, &session.peer_id, &session.client_name, &queued.argv, start.elapsed()).await;

        if outcome.is_write() {
            total_dirty += match outcome {
                crate::core::commands::command_trait::WriteOutcome::Write { keys_modified } => keys_modified,
                crate::core::commands::command_trait::WriteOutcome::Delete { keys_deleted } => keys_deleted,
                crate::core::commands::command_trait::WriteOutcome::Flush => 1,
                crate::core::commands::command_trait::WriteOutcome::DidNotWrite => 0,
            };
        }
        responses.push(reply);
    }

    // Step 9.
    if multi_propagated {
        state.increment_dirty(total_dirty.max(1));
        let role_after_block = state.replication.role();
        let flipped_to_replica = matches!(role_before_block, ReplicationRole::Primary)
            && matches!(role_after_block, ReplicationRole::Replica { .. });
        if flipped_to_replica {
            debug!(session_id, "role flipped mid-transaction, appending synthetic EXEC to backlog");
            state.replication.append_synthetic_exec_to_backlog();
        }
    }

    // Step 10 was already folded into `take` above (it both reads and
    // clears the queue/flags in one shot).

    // Step 11: always notify MONITOR last, after dispatch, so observers see
    // the natural order MULTI, EXEC, [queued commands].
    state.monitor.notify(session_id, db_index, "EXEC");

    RespValue::Array(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::state::ServerState;
    use crate::connection::Session;

    fn test_session(state: &Arc<ServerState>, id: u64) -> Session {
        let _ = state;
        Session::new(id, "127.0.0.1:1".to_string())
    }

    #[tokio::test]
    async fn exec_without_multi_errors() {
        let state = ServerState::new(Config::default());
        let session = test_session(&state, 1);
        let reply = handle_exec(&state, &session).await;
        assert_eq!(reply, RespValue::Error("ERR EXEC without MULTI".to_string()));
    }

    #[tokio::test]
    async fn multi_then_discard_clears_state() {
        let state = ServerState::new(Config::default());
        let session_id = 1;
        assert_eq!(handle_multi(&state, session_id), RespValue::ok());
        assert_eq!(handle_discard(&state, session_id), RespValue::ok());
        assert!(!state.tx_manager.is_in_multi(session_id));
    }

    #[tokio::test]
    async fn nested_multi_is_rejected_and_preserves_first() {
        let state = ServerState::new(Config::default());
        let session_id = 1;
        assert_eq!(handle_multi(&state, session_id), RespValue::ok());
        let second = handle_multi(&state, session_id);
        assert_eq!(
            second,
            RespValue::Error("ERR MULTI calls can not be nested".to_string())
        );
        assert!(state.tx_manager.is_in_multi(session_id));
    }

    #[tokio::test]
    async fn watch_inside_multi_is_rejected() {
        let state = ServerState::new(Config::default());
        let session_id = 1;
        handle_multi(&state, session_id);
        let reply = handle_watch(&state, session_id, 0, vec![Bytes::from_static(b"k")]);
        assert_eq!(
            reply,
            RespValue::Error("ERR WATCH inside MULTI is not allowed".to_string())
        );
    }

    #[tokio::test]
    async fn unwatch_clears_dirty_cas_but_not_dirty_exec() {
        let state = ServerState::new(Config::default());
        let session_id = 1;
        handle_multi(&state, session_id);
        state.tx_manager.mark_dirty_cas(session_id);
        state.tx_manager.flag_error(session_id);

        handle_unwatch(&state, session_id);

        assert!(!state.tx_manager.is_dirty_cas(session_id));
        assert!(state.tx_manager.is_dirty_exec(session_id));
    }

    #[tokio::test]
    async fn exec_with_empty_queue_returns_empty_array() {
        let state = ServerState::new(Config::default());
        let session = test_session(&state, 1);
        handle_multi(&state, session.session_id);
        let reply = handle_exec(&state, &session).await;
        assert_eq!(reply, RespValue::Array(vec![]));
    }

    #[tokio::test]
    async fn exec_with_dirty_cas_returns_null_array_and_clears_state() {
        let state = ServerState::new(Config::default());
        let session = test_session(&state, 1);
        handle_multi(&state, session.session_id);
        state.tx_manager.mark_dirty_cas(session.session_id);

        let reply = handle_exec(&state, &session).await;
        assert_eq!(reply, RespValue::NullArray);
        assert!(!state.tx_manager.is_in_multi(session.session_id));
    }

    #[tokio::test]
    async fn exec_with_dirty_exec_returns_execabort() {
        let state = ServerState::new(Config::default());
        let session = test_session(&state, 1);
        handle_multi(&state, session.session_id);
        state.tx_manager.flag_error(session.session_id);

        let reply = handle_exec(&state, &session).await;
        assert_eq!(
            reply,
            RespValue::Error("EXECABORT Transaction discarded because of previous errors.".to_string())
        );
    }
}
