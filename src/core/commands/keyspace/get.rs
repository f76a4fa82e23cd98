// src/core/commands/keyspace/get.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::{extract_bytes, validate_arg_count};
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Get {
    pub key: Bytes,
}

impl ParseCommand for Get {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 1, "GET")?;
        Ok(Get {
            key: extract_bytes(&args[0])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for Get {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let shard = ctx.single_shard_mut()?;
        let value = match shard.get(&self.key) {
            Some(v) if !v.is_expired() => RespValue::BulkString(v.data.clone()),
            _ => RespValue::Null,
        };
        Ok((value, WriteOutcome::DidNotWrite))
    }
}

impl Get {
    pub fn flags() -> CommandFlags {
        CommandFlags::READONLY
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
}
