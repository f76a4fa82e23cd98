// src/core/commands/keyspace/flushdb.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::{ExecutionContext, ExecutionLocks};
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `FLUSHDB`: clears every key in the client's currently selected database.
/// `touch_on_flush` must run before the keys are actually cleared, since it
/// decides "does this watched key currently exist?".
#[derive(Debug, Clone, Default)]
pub struct FlushDb;

impl ParseCommand for FlushDb {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "FLUSHDB")?;
        Ok(FlushDb)
    }
}

#[async_trait]
impl ExecutableCommand for FlushDb {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        // Replaying inside an EXEC block that queued a FLUSHDB/FLUSHALL
        // pre-locks every shard for the whole transaction, so reuse those
        // guards instead of re-locking (the per-shard mutex isn't
        // reentrant), the shard lock must never be acquired twice by the
        // same call chain.
        if let ExecutionLocks::All { guards } = &mut ctx.locks {
            ctx.state
                .watch_registry
                .touch_on_flush_db_locked(ctx.db_index, guards, ctx.db, &ctx.state.tx_manager);
            for guard in guards.iter_mut() {
                guard.clear();
            }
            return Ok((RespValue::ok(), WriteOutcome::Flush));
        }

        ctx.state
            .watch_registry
            .touch_on_flush_db(ctx.db_index, ctx.db, &ctx.state.tx_manager)
            .await;

        let mut guards = ctx.db.lock_all_shards().await;
        for guard in guards.iter_mut() {
            guard.clear();
        }

        Ok((RespValue::ok(), WriteOutcome::Flush))
    }
}

impl FlushDb {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
