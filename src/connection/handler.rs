// src/connection/handler.rs

//! `ConnectionHandler`: owns the framed socket for one client connection and
//! runs its read-dispatch-write loop. Scoped down from
//! `spineldb::connection::handler::ConnectionHandler`: no TLS, pub/sub mode,
//! or replica handoff, just frame-in, dispatch, frame-out, until disconnect
//! or shutdown.

use super::session::Session;
use crate::core::handler::dispatch_command;
use crate::core::errors::DbError;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use crate::core::state::ServerState;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

pub struct ConnectionHandler {
    framed: Framed<TcpStream, RespFrameCodec>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    session: Session,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        state: Arc<ServerState>,
        session_id: u64,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, RespFrameCodec),
            addr,
            session: Session::new(session_id, addr.to_string()),
            state,
            shutdown_rx,
        }
    }

    /// Runs the connection until the peer disconnects, a framing error
    /// occurs, or the server starts shutting down. Always cleans up the
    /// session's transaction/watch state on the way out, so a client that
    /// drops mid-MULTI never leaves a dangling watcher behind.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    debug!(session_id = self.session.session_id, "connection closing for server shutdown");
                    break;
                }
                frame = self.framed.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            if let Err(e) = self.handle_frame(frame).await {
                                warn!(session_id = self.session.session_id, "failed to write response: {e}");
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            debug!(addr = %self.addr, "connection error: {e}");
                            break;
                        }
                        None => {
                            debug!(addr = %self.addr, "connection closed by peer");
                            break;
                        }
                    }
                }
            }
        }
        self.state.forget_session(self.session.session_id);
    }

    async fn handle_frame(&mut self, frame: RespFrame) -> Result<(), DbError> {
        let reply = dispatch_command(&self.state, &mut self.session, frame).await;
        self.framed.send(reply.into()).await
    }
}
