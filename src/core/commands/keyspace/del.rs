// src/core/commands/keyspace/del.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::extract_bytes;
use crate::core::database::ExecutionContext;
use crate::core::database::locking::ExecutionLocks;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl ParseCommand for Del {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        if args.is_empty() {
            return Err(DbError::WrongArgumentCount("DEL".to_string()));
        }
        let keys = args.iter().map(extract_bytes).collect::<Result<Vec<_>, _>>()?;
        Ok(Del { keys })
    }
}

#[async_trait]
impl ExecutableCommand for Del {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let db_index = ctx.db_index;
        let mut deleted: u64 = 0;

        for key in &self.keys {
            let existed = match &mut ctx.locks {
                ExecutionLocks::Single { guard, .. } => guard.remove(key).is_some(),
                ExecutionLocks::Multi { guards } => {
                    let shard_index = ctx.db.get_shard_index(key);
                    guards
                        .get_mut(&shard_index)
                        .is_some_and(|g| g.remove(key).is_some())
                }
                // Held when DEL is replaying inside an EXEC block that also
                // queued a FLUSHDB/FLUSHALL, which pre-locks every shard.
                ExecutionLocks::All { guards } => {
                    let shard_index = ctx.db.get_shard_index(key);
                    guards
                        .get_mut(shard_index)
                        .is_some_and(|g| g.remove(key).is_some())
                }
                ExecutionLocks::None => return Err(DbError::Internal("DEL expected shard locks".into())),
            };
            if existed {
                deleted += 1;
                ctx.state.watch_registry.touch(db_index, key, &ctx.state.tx_manager);
            }
        }

        Ok((RespValue::Integer(deleted as i64), WriteOutcome::Delete { keys_deleted: deleted }))
    }
}

impl Del {
    pub fn flags() -> CommandFlags {
        CommandFlags::WRITE
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        self.keys.clone()
    }
}
