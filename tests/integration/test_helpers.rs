// tests/integration/test_helpers.rs

//! Test helpers for the integration suite: a `TestContext` wrapping a real
//! `ServerState`, so tests drive the same `dispatch_command` seam a live
//! connection does instead of poking module internals directly.

use bytes::Bytes;
use driftdb::config::Config;
use driftdb::connection::Session;
use driftdb::core::RespValue;
use driftdb::core::handler::dispatch_command;
use driftdb::core::protocol::RespFrame;
use driftdb::core::state::ServerState;
use std::sync::Arc;

pub struct TestContext {
    pub state: Arc<ServerState>,
}

impl TestContext {
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.databases = 4;
        Self {
            state: ServerState::new(config),
        }
    }

    /// Creates a fresh session with its own session id, as a new client
    /// connection would get from `ServerState::next_session_id`.
    pub fn new_session(&self) -> Session {
        Session::new(self.state.next_session_id(), "127.0.0.1:0".to_string())
    }

    /// Encodes `args` as a command array and runs it through
    /// `dispatch_command`, exactly as a decoded frame off the wire would be.
    pub async fn run(&self, session: &mut Session, args: &[&str]) -> RespValue {
        let frame = RespFrame::Array(
            args.iter()
                .map(|a| RespFrame::BulkString(Bytes::from(a.to_string())))
                .collect(),
        );
        dispatch_command(&self.state, session, frame).await
    }
}
