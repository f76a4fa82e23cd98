// src/core/commands/generic/unwatch.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Unwatch;

impl ParseCommand for Unwatch {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "UNWATCH")?;
        Ok(Unwatch)
    }
}

#[async_trait]
impl ExecutableCommand for Unwatch {
    async fn execute<'a>(
        &self,
        _ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        Err(DbError::Internal(
            "UNWATCH should be handled by the transaction action binding".into(),
        ))
    }
}

impl Unwatch {
    pub fn flags() -> CommandFlags {
        CommandFlags::TRANSACTION | CommandFlags::NO_PROPAGATE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
