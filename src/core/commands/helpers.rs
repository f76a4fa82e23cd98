// src/core/commands/helpers.rs

//! Helper functions for parsing command arguments from `RespFrame`s.
//! These reduce boilerplate and ensure consistent error handling across commands.

use crate::core::DbError;
use crate::core::protocol::RespFrame;
use bytes::Bytes;

/// Extracts a `String` from a `RespFrame::BulkString`.
pub fn extract_string(frame: &RespFrame) -> Result<String, DbError> {
    if let RespFrame::BulkString(bs) = frame {
        String::from_utf8(bs.to_vec()).map_err(|_| DbError::ProtocolError("invalid utf-8 argument".into()))
    } else {
        Err(DbError::ProtocolError("expected bulk string argument".into()))
    }
}

/// Extracts `Bytes` from a `RespFrame::BulkString`.
pub fn extract_bytes(frame: &RespFrame) -> Result<Bytes, DbError> {
    match frame {
        RespFrame::BulkString(bs) => Ok(bs.clone()),
        _ => Err(DbError::ProtocolError("expected bulk string argument".into())),
    }
}

/// Extracts an `i64` from a `RespFrame::BulkString` argument.
pub fn extract_int(frame: &RespFrame) -> Result<i64, DbError> {
    extract_string(frame)?
        .parse::<i64>()
        .map_err(|_| DbError::NotAnInteger)
}

/// Validates that the number of arguments matches an exact expected count.
pub fn validate_arg_count(args: &[RespFrame], expected: usize, cmd: &str) -> Result<(), DbError> {
    if args.len() != expected {
        Err(DbError::WrongArgumentCount(cmd.to_string()))
    } else {
        Ok(())
    }
}

/// Validates that at least `min` arguments were supplied.
pub fn validate_min_arg_count(args: &[RespFrame], min: usize, cmd: &str) -> Result<(), DbError> {
    if args.len() < min {
        Err(DbError::WrongArgumentCount(cmd.to_string()))
    } else {
        Ok(())
    }
}

/// Extracts the raw argv (command name + arguments) from a command's wire
/// frame as owned `Bytes`, for consumers that need the original bytes rather
/// than a parsed `Command`, chiefly the slow log, which records the argv a
/// command was invoked with, truncation included.
pub fn frame_to_argv(frame: &RespFrame) -> Vec<Bytes> {
    match frame {
        RespFrame::Array(parts) => parts
            .iter()
            .map(|p| match p {
                RespFrame::BulkString(b) => b.clone(),
                RespFrame::SimpleString(s) => Bytes::from(s.clone()),
                RespFrame::Integer(i) => Bytes::from(i.to_string()),
                other => Bytes::from(format!("{other:?}")),
            })
            .collect(),
        other => vec![Bytes::from(format!("{other:?}"))],
    }
}
