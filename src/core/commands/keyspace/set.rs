// src/core/commands/keyspace/set.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::extract_bytes;
use crate::core::database::shard::StoredValue;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
}

impl ParseCommand for Set {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        if args.len() != 2 {
            return Err(DbError::WrongArgumentCount("SET".to_string()));
        }
        Ok(Set {
            key: extract_bytes(&args[0])?,
            value: extract_bytes(&args[1])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for Set {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let db_index = ctx.db_index;
        let shard = ctx.single_shard_mut()?;
        shard.insert(self.key.clone(), StoredValue::new(self.value.clone()));

        // Touch unconditionally before replying: even an idempotent SET to
        // the same value still dirties watchers.
        ctx.state
            .watch_registry
            .touch(db_index, &self.key, &ctx.state.tx_manager);

        Ok((RespValue::ok(), WriteOutcome::Write { keys_modified: 1 }))
    }
}

impl Set {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
}
