// src/core/commands/generic/slowlog.rs

use crate::core::commands::command_trait::{CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::helpers::extract_string;
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

const DEFAULT_GET_COUNT: usize = 10;

const HELP_TEXT: &[&str] = &[
    "SLOWLOG GET [count]",
    "    Return the top <count> entries from the slow log (default: 10, -1 means all).",
    "SLOWLOG LEN",
    "    Return the length of the slow log.",
    "SLOWLOG RESET",
    "    Reset the slow log.",
    "SLOWLOG HELP",
    "    Print this help.",
];

#[derive(Debug, Clone)]
pub enum SlowlogSubcommand {
    Get(Option<i64>),
    Len,
    Reset,
    Help,
}

impl Default for SlowlogSubcommand {
    fn default() -> Self {
        Self::Len
    }
}

#[derive(Debug, Clone, Default)]
pub struct Slowlog {
    pub subcommand: SlowlogSubcommand,
}

impl ParseCommand for Slowlog {
    fn parse(args: &[RespFrame]) -> Result<Self, DbError> {
        if args.is_empty() {
            return Err(DbError::WrongArgumentCount("SLOWLOG".to_string()));
        }
        let sub = extract_string(&args[0])?.to_ascii_lowercase();
        let subcommand = match sub.as_str() {
            "get" => {
                if args.len() > 2 {
                    return Err(DbError::WrongArgumentCount("SLOWLOG GET".to_string()));
                }
                let count = if args.len() == 2 {
                    Some(extract_string(&args[1])?.parse::<i64>()?)
                } else {
                    None
                };
                SlowlogSubcommand::Get(count)
            }
            "len" => {
                if args.len() != 1 {
                    return Err(DbError::WrongArgumentCount("SLOWLOG LEN".to_string()));
                }
                SlowlogSubcommand::Len
            }
            "reset" => {
                if args.len() != 1 {
                    return Err(DbError::WrongArgumentCount("SLOWLOG RESET".to_string()));
                }
                SlowlogSubcommand::Reset
            }
            "help" => SlowlogSubcommand::Help,
            other => {
                return Err(DbError::UnknownCommand(format!("SLOWLOG {other}")));
            }
        };
        Ok(Slowlog { subcommand })
    }
}

#[async_trait]
impl ExecutableCommand for Slowlog {
    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        let response = match self.subcommand {
            SlowlogSubcommand::Get(count) => {
                // A negative count (conventionally -1) means "all entries".
                let n = match count {
                    None => DEFAULT_GET_COUNT,
                    Some(c) if c < 0 => ctx.state.slowlog.len(),
                    Some(c) => c as usize,
                };
                RespValue::Array(ctx.state.slowlog.get(n).iter().map(|e| e.to_resp()).collect())
            }
            SlowlogSubcommand::Len => RespValue::Integer(ctx.state.slowlog.len() as i64),
            SlowlogSubcommand::Reset => {
                ctx.state.slowlog.reset();
                RespValue::ok()
            }
            SlowlogSubcommand::Help => RespValue::Array(
                HELP_TEXT
                    .iter()
                    .map(|line| RespValue::SimpleString(line.to_string()))
                    .collect(),
            ),
        };
        Ok((response, WriteOutcome::DidNotWrite))
    }
}

impl Slowlog {
    pub fn flags() -> CommandFlags {
        CommandFlags::ADMIN | CommandFlags::NO_PROPAGATE | CommandFlags::READONLY
    }

    pub fn get_keys(&self) -> Vec<Bytes> {
        vec![]
    }
}
