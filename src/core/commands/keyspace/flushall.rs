// src/core/commands/keyspace/flushall.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::{ExecutionContext, ExecutionLocks};
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `FLUSHALL`: clears every key in every database. Uses
/// `touch_on_flush(ALL)` rather than per-database flush.
#[derive(Debug, Clone, Default)]
pub struct FlushAll;

impl ParseCommand for FlushAll {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "FLUSHALL")?;
        Ok(FlushAll)
    }
}

#[async_trait]
impl ExecutableCommand for FlushAll {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        // The current database's shards may already be locked for the
        // duration of an enclosing EXEC block (see `FlushDb::execute`); every
        // other database is locked fresh here exactly as at the top level.
        for (db_index, db) in ctx.state.dbs.iter().enumerate() {
            if db_index == ctx.db_index
                && let ExecutionLocks::All { guards } = &mut ctx.locks
            {
                ctx.state
                    .watch_registry
                    .touch_on_flush_db_locked(db_index, guards, db, &ctx.state.tx_manager);
                for guard in guards.iter_mut() {
                    guard.clear();
                }
                continue;
            }
            ctx.state
                .watch_registry
                .touch_on_flush_db(db_index, db, &ctx.state.tx_manager)
                .await;
            let mut guards = db.lock_all_shards().await;
            for guard in guards.iter_mut() {
                guard.clear();
            }
        }

        Ok((RespValue::ok(), WriteOutcome::Flush))
    }
}

impl FlushAll {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
