// src/core/commands/generic/multi.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `MULTI` is always intercepted by the transaction handler before reaching
/// generic dispatch; this struct exists so the command can be parsed, carry
/// flags, and be named in error messages.
#[derive(Debug, Clone, Default)]
pub struct Multi;

impl ParseCommand for Multi {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "MULTI")?;
        Ok(Multi)
    }
}

#[async_trait]
impl ExecutableCommand for Multi {
    async fn execute<'a>(
        &self,
        _ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        Err(DbError::Internal(
            "MULTI should be intercepted by the transaction handler".into(),
        ))
    }
}

impl Multi {
    pub fn flags() -> CommandFlags {
        CommandFlags::TRANSACTION | CommandFlags::NO_PROPAGATE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
