// src/core/handler/dispatch.rs

//! The command-dispatch seam: routes a freshly decoded frame to either
//! immediate execution, transaction queueing, or one of the transaction
//! control verbs that always bypass the queue. Stands in for the external
//! command dispatcher (`call`) spec.md §1 excludes from specification. It
//! only needs to exist here so MULTI/EXEC/WATCH/SLOWLOG have a concrete
//! caller to integrate with.

use super::transaction;
use crate::connection::Session;
use crate::core::commands::command_trait::{CommandExt, WriteOutcome};
use crate::core::commands::helpers::frame_to_argv;
use crate::core::database::{Db, ExecutionContext, ExecutionLocks};
use crate::core::protocol::RespFrame;
use crate::core::state::ServerState;
use crate::core::{Command, RespValue};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs a single already-parsed command to completion: acquires whatever
/// shard locks it needs, executes it, and returns its reply alongside the
/// `WriteOutcome` the caller needs for propagation bookkeeping. Used both
/// for top-level dispatch and for EXEC's replay loop; `in_exec` is the only
/// thing that differs between the two call sites.
pub async fn execute_one(
    state: &Arc<ServerState>,
    session_id: u64,
    db_index: usize,
    command: &Command,
    in_exec: bool,
) -> (RespValue, WriteOutcome) {
    let Some(db) = state.get_db(db_index) else {
        return (
            RespValue::Error(format!("ERR DB index {db_index} out of range")),
            WriteOutcome::DidNotWrite,
        );
    };
    let locks = db.determine_locks_for_command(command).await;
    let mut ctx = ExecutionContext {
        state: state.clone(),
        locks,
        db: &db,
        db_index,
        command: Some(command.clone()),
        session_id,
        in_exec,
    };
    match command.execute(&mut ctx).await {
        Ok((reply, outcome)) => (reply, outcome),
        Err(e) => (RespValue::Error(e.to_string()), WriteOutcome::DidNotWrite),
    }
}

/// Executes one queued command during EXEC's replay loop, reusing the
/// lock(s) already acquired for the whole transaction instead of letting the
/// command acquire its own. Holding one set of guards across the full
/// replay is what makes the block atomic from another client's perspective.
/// Ownership of `locks` is swapped into the `ExecutionContext` and back out
/// afterwards, the same temp-guards trick `spineldb`'s transaction handler
/// uses to hand the same `MutexGuard`s to each queued command in turn.
pub async fn execute_queued<'a>(
    state: &Arc<ServerState>,
    session_id: u64,
    db: &'a Db,
    db_index: usize,
    command: &Command,
    locks: &mut ExecutionLocks<'a>,
) -> (RespValue, WriteOutcome) {
    let taken = std::mem::replace(locks, ExecutionLocks::None);
    let mut ctx = ExecutionContext {
        state: state.clone(),
        locks: taken,
        db,
        db_index,
        command: Some(command.clone()),
        session_id,
        in_exec: true,
    };
    let result = command.execute(&mut ctx).await;
    *locks = ctx.locks;
    match result {
        Ok((reply, outcome)) => (reply, outcome),
        Err(e) => (RespValue::Error(e.to_string()), WriteOutcome::DidNotWrite),
    }
}

/// Records one completed command execution in the slow log, gated by the
/// currently configured threshold. Tunables are read fresh on every call
/// (`config` is not cached), per spec.md §6.
pub async fn record_slowlog(
    state: &Arc<ServerState>,
    peer_id: &str,
    client_name: &str,
    argv: &[Bytes],
    duration: Duration,
) {
    let (log_slower_than, max_len) = {
        let cfg = state.config.lock().await;
        (cfg.slowlog.log_slower_than, cfg.slowlog.max_len)
    };
    state.slowlog.push_if_needed(
        peer_id,
        client_name,
        argv,
        duration.as_micros() as u64,
        log_slower_than,
        max_len,
    );
}

/// The top-level entry point: decodes one command from `frame` and routes
/// it to the right place. `IN_MULTI` clients get every command queued
/// except the transaction-control verbs (`MULTI`, `EXEC`, `DISCARD`,
/// `WATCH`, `UNWATCH`), which always run immediately: they are the verbs
/// that manage the queue itself, so queuing them would be meaningless (and,
/// in WATCH's case, is explicitly rejected instead).
pub async fn dispatch_command(state: &Arc<ServerState>, session: &mut Session, frame: RespFrame) -> RespValue {
    let argv = frame_to_argv(&frame);

    let command = match Command::try_from(frame) {
        Ok(cmd) => cmd,
        Err(e) => {
            // A command that fails to parse while queueing (unknown verb,
            // bad arity) never reaches the queue, but still dirties it.
            if state.tx_manager.is_in_multi(session.session_id) {
                state.tx_manager.flag_error(session.session_id);
            }
            return RespValue::Error(e.to_string());
        }
    };

    match &command {
        Command::Multi(_) => {
            let start = Instant::now();
            let reply = transaction::handle_multi(state, session.session_id);
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
        Command::Discard(_) => {
            let start = Instant::now();
            let reply = transaction::handle_discard(state, session.session_id);
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
        Command::Watch(watch) => {
            let start = Instant::now();
            let reply = transaction::handle_watch(state, session.session_id, session.db_index, watch.keys.clone());
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
        Command::Unwatch(_) => {
            let start = Instant::now();
            let reply = transaction::handle_unwatch(state, session.session_id);
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
        Command::Exec(_) => {
            let start = Instant::now();
            let reply = transaction::handle_exec(state, session).await;
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
        _ if state.tx_manager.is_in_multi(session.session_id) => {
            match state.tx_manager.enqueue(session.session_id, command, argv) {
                Ok(()) => RespValue::SimpleString("QUEUED".to_string()),
                Err(e) => {
                    state.tx_manager.flag_error(session.session_id);
                    RespValue::Error(e.to_string())
                }
            }
        }
        _ => {
            let start = Instant::now();
            debug!(session_id = session.session_id, name = command.name(), "dispatching command");
            let (reply, _outcome) = execute_one(state, session.session_id, session.db_index, &command, false).await;
            record_slowlog(state, &session.peer_id, &session.client_name, &argv, start.elapsed()).await;
            reply
        }
    }
}
