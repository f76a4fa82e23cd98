// src/core/commands/keyspace/expire.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::{extract_bytes, extract_int, validate_arg_count};
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Expire {
    pub key: Bytes,
    pub seconds: i64,
}

impl ParseCommand for Expire {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 2, "EXPIRE")?;
        Ok(Expire {
            key: extract_bytes(&args[0])?,
            seconds: extract_int(&args[1])?,
        })
    }
}

#[async_trait]
impl ExecutableCommand for Expire {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let db_index = ctx.db_index;
        let shard = ctx.single_shard_mut()?;

        let Some(value) = shard.get_mut(&self.key).filter(|v| !v.is_expired()) else {
            return Ok((RespValue::Integer(0), WriteOutcome::DidNotWrite));
        };

        if self.seconds <= 0 {
            shard.remove(&self.key);
        } else {
            value.expires_at = Some(Instant::now() + Duration::from_secs(self.seconds as u64));
        }

        ctx.state
            .watch_registry
            .touch(db_index, &self.key, &ctx.state.tx_manager);

        Ok((RespValue::Integer(1), WriteOutcome::Write { keys_modified: 1 }))
    }
}

impl Expire {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
}
