// src/core/commands/generic/discard.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `DISCARD` is always intercepted by the transaction handler.
#[derive(Debug, Clone, Default)]
pub struct Discard;

impl ParseCommand for Discard {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "DISCARD")?;
        Ok(Discard)
    }
}

#[async_trait]
impl ExecutableCommand for Discard {
    async fn execute<'a>(
        &self,
        _ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        Err(DbError::Internal(
            "DISCARD should be intercepted by the transaction handler".into(),
        ))
    }
}

impl Discard {
    pub fn flags() -> CommandFlags {
        CommandFlags::TRANSACTION | CommandFlags::NO_PROPAGATE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
