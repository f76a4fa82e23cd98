// src/core/commands/generic/exec.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::validate_arg_count;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// `EXEC` is always intercepted by the transaction handler; see
/// `crate::core::handler::transaction` for the actual commit algorithm.
#[derive(Debug, Clone, Default)]
pub struct Exec;

impl ParseCommand for Exec {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        validate_arg_count(args, 0, "EXEC")?;
        Ok(Exec)
    }
}

#[async_trait]
impl ExecutableCommand for Exec {
    async fn execute<'a>(
        &self,
        _ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        Err(DbError::Internal(
            "EXEC should be intercepted by the transaction handler".into(),
        ))
    }
}

impl Exec {
    pub fn flags() -> CommandFlags {
        CommandFlags::TRANSACTION | CommandFlags::NO_PROPAGATE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
