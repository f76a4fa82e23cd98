// src/core/protocol/mod.rs

pub mod resp_frame;
pub mod resp_value;

pub use resp_frame::{RespFrame, RespFrameCodec, SYNTHETIC_EXEC_BYTES};
pub use resp_value::RespValue;
