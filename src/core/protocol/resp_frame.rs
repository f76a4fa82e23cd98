// src/core/protocol/resp_frame.rs

//! Implements the RESP2 (REdis Serialization Protocol) frame structure and the
//! corresponding `Encoder`/`Decoder` for network communication.

use crate::core::DbError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The CRLF (Carriage Return, Line Feed) sequence used to terminate lines in RESP.
const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = 2;

// Protocol-level limits to prevent denial-of-service from malformed frames.
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;

/// The literal wire bytes for a one-element array containing the bulk string
/// "EXEC". Used to terminate a replicated transaction block when the backlog
/// is carrying a synthetic MULTI issued before a master -> replica role flip.
/// Preserve these bytes exactly: replicas and the backlog match on the wire
/// form, not on a re-encoded equivalent.
pub const SYNTHETIC_EXEC_BYTES: &[u8] = b"*1\r\n$4\r\nEXEC\r\n";

/// An enum representing a single frame in the RESP2 protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Encodes a frame into a standalone byte vector. Useful for propagation
    /// channels where a complete byte vector is needed rather than a live codec.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, DbError> {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding `RespFrame`s.
#[derive(Debug, Default)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = DbError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Error(s) => {
                dst.extend_from_slice(b"-");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                dst.extend_from_slice(b":");
                dst.extend_from_slice(i.to_string().as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BulkString(b) => {
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(b.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => {
                dst.extend_from_slice(b"$-1\r\n");
            }
            RespFrame::NullArray => {
                dst.extend_from_slice(b"*-1\r\n");
            }
            RespFrame::Array(arr) => {
                dst.extend_from_slice(b"*");
                dst.extend_from_slice(arr.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                for frame in arr {
                    self.encode(frame, dst)?;
                }
            }
        }
        Ok(())
    }
}

/// Finds the index of the next CRLF in `src`, starting at `start`.
fn find_crlf(src: &BytesMut, start: usize) -> Option<usize> {
    src[start..]
        .windows(CRLF_LEN)
        .position(|w| w == CRLF)
        .map(|pos| start + pos)
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = DbError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, 0).map(|opt| {
            opt.map(|(frame, consumed)| {
                src.advance(consumed);
                frame
            })
        })
    }
}

/// Recursively attempts to decode a single frame starting at `src[0..]`.
/// Returns `Ok(Some((frame, bytes_consumed)))` when a complete frame is
/// available, `Ok(None)` when more data is needed, or an error on malformed
/// input. `depth` bounds recursion for nested arrays.
fn decode_frame(src: &BytesMut, depth: usize) -> Result<Option<(RespFrame, usize)>, DbError> {
    if depth > 32 {
        return Err(DbError::ProtocolError("nesting too deep".into()));
    }
    if src.is_empty() {
        return Ok(None);
    }

    let Some(line_end) = find_crlf(src, 1) else {
        return Ok(None);
    };
    let line = &src[1..line_end];

    match src[0] {
        b'+' => {
            let s = String::from_utf8_lossy(line).into_owned();
            Ok(Some((RespFrame::SimpleString(s), line_end + CRLF_LEN)))
        }
        b'-' => {
            let s = String::from_utf8_lossy(line).into_owned();
            Ok(Some((RespFrame::Error(s), line_end + CRLF_LEN)))
        }
        b':' => {
            let n = parse_i64(line)?;
            Ok(Some((RespFrame::Integer(n), line_end + CRLF_LEN)))
        }
        b'$' => {
            let len = parse_i64(line)?;
            if len < 0 {
                return Ok(Some((RespFrame::Null, line_end + CRLF_LEN)));
            }
            let len = len as usize;
            if len > MAX_BULK_STRING_SIZE {
                return Err(DbError::ProtocolError("bulk string too large".into()));
            }
            let data_start = line_end + CRLF_LEN;
            let data_end = data_start + len;
            if src.len() < data_end + CRLF_LEN {
                return Ok(None);
            }
            let bytes = Bytes::copy_from_slice(&src[data_start..data_end]);
            Ok(Some((RespFrame::BulkString(bytes), data_end + CRLF_LEN)))
        }
        b'*' => {
            let len = parse_i64(line)?;
            if len < 0 {
                return Ok(Some((RespFrame::NullArray, line_end + CRLF_LEN)));
            }
            let len = len as usize;
            if len > MAX_FRAME_ELEMENTS {
                return Err(DbError::ProtocolError("array too large".into()));
            }
            let mut consumed = line_end + CRLF_LEN;
            let mut elements = Vec::with_capacity(len);
            for _ in 0..len {
                let remaining = BytesMut::from(&src[consumed..]);
                match decode_frame(&remaining, depth + 1)? {
                    Some((frame, used)) => {
                        elements.push(frame);
                        consumed += used;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((RespFrame::Array(elements), consumed)))
        }
        other => Err(DbError::ProtocolError(format!(
            "unknown frame type byte '{}'",
            other as char
        ))),
    }
}

fn parse_i64(line: &[u8]) -> Result<i64, DbError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| DbError::ProtocolError("invalid integer in frame".into()))
}
