// src/core/commands/keyspace/incr.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::{extract_bytes, validate_arg_count};
use crate::core::database::shard::StoredValue;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `INCR key`: the stand-in write command whose execution-time failure
/// (value not an integer) exercises the case of an error inside EXEC that
/// does not abort the rest of the transaction block.
#[derive(Debug, Clone, Default)]
pub struct Incr {
    pub key: Bytes,
}

impl ParseCommand for Incr {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 1, "INCR")?;
        Ok(Incr {
            key: extract_bytes(&args[0])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for Incr {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let db_index = ctx.db_index;
        let shard = ctx.single_shard_mut()?;

        let current = match shard.get(&self.key) {
            Some(v) if !v.is_expired() => {
                std::str::from_utf8(&v.data)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(DbError::NotAnInteger)?
            }
            _ => 0,
        };
        let next = current.checked_add(1).ok_or(DbError::Overflow)?;
        shard.insert(self.key.clone(), StoredValue::new(Bytes::from(next.to_string())));

        ctx.state
            .watch_registry
            .touch(db_index, &self.key, &ctx.state.tx_manager);

        Ok((RespValue::Integer(next), WriteOutcome::Write { keys_modified: 1 }))
    }
}

impl Incr {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
}
