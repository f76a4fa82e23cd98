// src/core/command.rs

//! The central `Command` enum: the parsed, typed representation of every
//! command this crate understands, and the single seam the dispatcher,
//! the transaction queue, and the slow log all operate on.

use crate::core::commands::command_trait::{CommandExt, CommandFlags, ExecutableCommand, ParseCommand, WriteOutcome};
use crate::core::commands::generic::{Discard, Exec, Multi, Slowlog, Unwatch, Watch};
use crate::core::commands::helpers::extract_string;
use crate::core::commands::keyspace::{Del, Echo, Expire, FlushAll, FlushDb, Get, Incr, Ping, Set};
use crate::core::database::ExecutionContext;
use crate::core::protocol::RespFrame;
use crate::core::{DbError, RespValue};
use async_trait::async_trait;
use bytes::Bytes;

/// Every command this crate can parse and execute. A queued command is
/// realized directly as an owned `Command` value: each variant already
/// holds its own `Bytes` argv (cheaply cloned, ref-counted), so queuing one
/// needs no separate ownership bookkeeping.
#[derive(Debug, Clone)]
pub enum Command {
    // Transaction control. Parsed and flag-tagged here, but actually handled
    // by `crate::core::handler::transaction` before `execute` is ever
    // invoked on them; see each struct's `execute` for the "should be
    // intercepted" sentinel error.
    Multi(Multi),
    Exec(Exec),
    Discard(Discard),
    Watch(Watch),
    Unwatch(Unwatch),
    Slowlog(Slowlog),

    // The minimal keyspace standing in for a general-purpose value type system.
    Get(Get),
    Set(Set),
    Incr(Incr),
    Del(Del),
    Expire(Expire),
    FlushDb(FlushDb),
    FlushAll(FlushAll),
    Ping(Ping),
    Echo(Echo),
}

impl Command {
    /// Parses a full command invocation (name + arguments) from already
    /// length-decoded RESP frames, as handed off by `TryFrom<RespFrame>`.
    pub fn parse(name: &str, args: &[RespFrame]) -> Result<Self, DbError> {
        match name.to_ascii_uppercase().as_str() {
            "MULTI" => Ok(Command::Multi(Multi::parse(args)?)),
            "EXEC" => Ok(Command::Exec(Exec::parse(args)?)),
            "DISCARD" => Ok(Command::Discard(Discard::parse(args)?)),
            "WATCH" => Ok(Command::Watch(Watch::parse(args)?)),
            "UNWATCH" => Ok(Command::Unwatch(Unwatch::parse(args)?)),
            "SLOWLOG" => Ok(Command::Slowlog(Slowlog::parse(args)?)),
            "GET" => Ok(Command::Get(Get::parse(args)?)),
            "SET" => Ok(Command::Set(Set::parse(args)?)),
            "INCR" => Ok(Command::Incr(Incr::parse(args)?)),
            "DEL" => Ok(Command::Del(Del::parse(args)?)),
            "EXPIRE" => Ok(Command::Expire(Expire::parse(args)?)),
            "FLUSHDB" => Ok(Command::FlushDb(FlushDb::parse(args)?)),
            "FLUSHALL" => Ok(Command::FlushAll(FlushAll::parse(args)?)),
            "PING" => Ok(Command::Ping(Ping::parse(args)?)),
            "ECHO" => Ok(Command::Echo(Echo::parse(args)?)),
            other => Err(DbError::UnknownCommand(other.to_string())),
        }
    }

}

#[async_trait]
impl CommandExt for Command {
    fn get_flags(&self) -> CommandFlags {
        match self {
            Command::Multi(_) => Multi::flags(),
            Command::Exec(_) => Exec::flags(),
            Command::Discard(_) => Discard::flags(),
            Command::Watch(_) => Watch::flags(),
            Command::Unwatch(_) => Unwatch::flags(),
            Command::Slowlog(_) => Slowlog::flags(),
            Command::Get(_) => Get::flags(),
            Command::Set(_) => Set::flags(),
            Command::Incr(_) => Incr::flags(),
            Command::Del(_) => Del::flags(),
            Command::Expire(_) => Expire::flags(),
            Command::FlushDb(_) => FlushDb::flags(),
            Command::FlushAll(_) => FlushAll::flags(),
            Command::Ping(_) => Ping::flags(),
            Command::Echo(_) => Echo::flags(),
        }
    }

    fn get_keys(&self) -> Vec<Bytes> {
        match self {
            Command::Multi(c) => c.get_keys(),
            Command::Exec(c) => c.get_keys(),
            Command::Discard(c) => c.get_keys(),
            Command::Watch(c) => c.get_keys(),
            Command::Unwatch(c) => c.get_keys(),
            Command::Slowlog(c) => c.get_keys(),
            Command::Get(c) => c.get_keys(),
            Command::Set(c) => c.get_keys(),
            Command::Incr(c) => c.get_keys(),
            Command::Del(c) => c.get_keys(),
            Command::Expire(c) => c.get_keys(),
            Command::FlushDb(c) => c.get_keys(),
            Command::FlushAll(c) => c.get_keys(),
            Command::Ping(c) => c.get_keys(),
            Command::Echo(c) => c.get_keys(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Multi(_) => "MULTI",
            Command::Exec(_) => "EXEC",
            Command::Discard(_) => "DISCARD",
            Command::Watch(_) => "WATCH",
            Command::Unwatch(_) => "UNWATCH",
            Command::Slowlog(_) => "SLOWLOG",
            Command::Get(_) => "GET",
            Command::Set(_) => "SET",
            Command::Incr(_) => "INCR",
            Command::Del(_) => "DEL",
            Command::Expire(_) => "EXPIRE",
            Command::FlushDb(_) => "FLUSHDB",
            Command::FlushAll(_) => "FLUSHALL",
            Command::Ping(_) => "PING",
            Command::Echo(_) => "ECHO",
        }
    }

    async fn execute<'a>(
        &self,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<(RespValue, WriteOutcome), DbError> {
        match self {
            Command::Multi(c) => c.execute(ctx).await,
            Command::Exec(c) => c.execute(ctx).await,
            Command::Discard(c) => c.execute(ctx).await,
            Command::Watch(c) => c.execute(ctx).await,
            Command::Unwatch(c) => c.execute(ctx).await,
            Command::Slowlog(c) => c.execute(ctx).await,
            Command::Get(c) => c.execute(ctx).await,
            Command::Set(c) => c.execute(ctx).await,
            Command::Incr(c) => c.execute(ctx).await,
            Command::Del(c) => c.execute(ctx).await,
            Command::Expire(c) => c.execute(ctx).await,
            Command::FlushDb(c) => c.execute(ctx).await,
            Command::FlushAll(c) => c.execute(ctx).await,
            Command::Ping(c) => c.execute(ctx).await,
            Command::Echo(c) => c.execute(ctx).await,
        }
    }
}

impl TryFrom<RespFrame> for Command {
    type Error = DbError;

    fn try_from(frame: RespFrame) -> Result<Self, Self::Error> {
        let RespFrame::Array(parts) = frame else {
            return Err(DbError::ProtocolError(
                "expected array frame for a command".into(),
            ));
        };
        let Some((name_frame, arg_frames)) = parts.split_first() else {
            return Err(DbError::ProtocolError("empty command array".into()));
        };
        let name = extract_string(name_frame)?;
        Command::parse(&name, arg_frames)
    }
}
