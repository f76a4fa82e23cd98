// src/core/commands/generic/watch.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::extract_bytes;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Watch {
    pub keys: Vec<Bytes>,
}

impl ParseCommand for Watch {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        if args.is_empty() {
            return Err(DbError::WrongArgumentCount("WATCH".to_string()));
        }
        let keys = args.iter().map(extract_bytes).collect::<Result<Vec<_>, _>>()?;
        Ok(Watch { keys })
    }
}

#[async_trait]
impl ExecutableCommand for Watch {
    async fn execute<'a>(
        &self,
        _ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        // WATCH inside MULTI is rejected by the binding layer before this is
        // ever reached; outside MULTI it's handled by
        // `handler::transaction::handle_watch`, which needs access to the
        // session's db index and the shared `WatchRegistry`.
        Err(DbError::Internal(
            "WATCH should be handled by the transaction action binding".into(),
        ))
    }
}

impl Watch {
    pub fn flags() -> CommandFlags {
        CommandFlags::TRANSACTION | CommandFlags::NO_PROPAGATE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        self.keys.clone()
    }
}
