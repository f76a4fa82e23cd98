// src/core/commands/command_trait.rs

//! Defines the core traits for all executable commands.

use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bitflags::bitflags;
use bytes::Bytes;

bitflags! {
    /// Flags that describe the properties and behavior of a command.
    /// The transaction handler unions these across a queued batch to decide,
    /// among other things, whether a read-only replica must reject the EXEC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CommandFlags: u32 {
        /// The command modifies the dataset.
        const WRITE          = 1 << 0;
        /// The command only reads data.
        const READONLY       = 1 << 1;
        /// An administrative command, exempt from the read-only-replica check.
        const ADMIN          = 1 << 2;
        /// A command related to transactions (`MULTI`, `EXEC`, `DISCARD`, ...).
        const TRANSACTION    = 1 << 3;
        /// The command should not be propagated to replicas or the AOF file.
        const NO_PROPAGATE   = 1 << 4;
    }
}

impl Default for CommandFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Represents the outcome of a write operation, used to decide whether a key
/// touch is needed and to update the dirty counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    DidNotWrite,
    Write { keys_modified: u64 },
    Delete { keys_deleted: u64 },
    Flush,
}

impl WriteOutcome {
    /// Merges two `WriteOutcome` values, prioritizing the more impactful one.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Flush, _) | (_, Self::Flush) => Self::Flush,
            (Self::Delete { keys_deleted: k1 }, Self::Delete { keys_deleted: k2 }) => {
                Self::Delete {
                    keys_deleted: k1 + k2,
                }
            }
            (Self::Delete { keys_deleted: k1 }, Self::Write { keys_modified: k2 })
            | (Self::Write { keys_modified: k2 }, Self::Delete { keys_deleted: k1 }) => {
                Self::Delete {
                    keys_deleted: k1 + k2,
                }
            }
            (Self::Delete { keys_deleted }, Self::DidNotWrite)
            | (Self::DidNotWrite, Self::Delete { keys_deleted }) => Self::Delete { keys_deleted },
            (Self::Write { keys_modified: k1 }, Self::Write { keys_modified: k2 }) => Self::Write {
                keys_modified: k1 + k2,
            },
            (Self::Write { keys_modified }, Self::DidNotWrite)
            | (Self::DidNotWrite, Self::Write { keys_modified }) => Self::Write { keys_modified },
            (Self::DidNotWrite, Self::DidNotWrite) => Self::DidNotWrite,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::DidNotWrite)
    }
}

/// A composite trait combining command introspection with execution. Implemented
/// on the top-level `Command` enum by dispatching to each variant's struct.
#[async_trait]
pub trait CommandExt {
    /// Returns the flags for the command, used for the transaction's flag union
    /// and for the read-only-replica check.
    fn get_flags(&self) -> CommandFlags;
    /// Extracts the keys the command reads or writes, for WATCH integration.
    fn get_keys(&self) -> Vec<Bytes>;
    /// A canonical uppercase name, used in error messages and the slow log.
    fn name(&self) -> &'static str;

    /// Executes the command within a given `ExecutionContext`.
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError>;
}

/// The core execution logic for a single command, implemented per command struct.
#[async_trait]
pub trait ExecutableCommand {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError>;
}

/// Parses a command's arguments from a slice of `RespFrame`.
pub trait ParseCommand: Sized {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError>;
}
