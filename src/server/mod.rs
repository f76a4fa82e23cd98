// src/server/mod.rs

//! The server's main loop: binds a listener, accepts connections, and spawns
//! one `ConnectionHandler` task per client. Scoped down from
//! `spineldb::server`: no TLS, metrics server, cluster, or persistence
//! subsystems to bring up, just state, a listener, and graceful shutdown.

use crate::config::Config;
use crate::connection::ConnectionHandler;
use crate::core::state::ServerState;
use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Waits for a termination signal appropriate to the platform.
async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }
    #[cfg(windows)]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C received, shutting down");
    }
}

/// Brings up the server: binds the configured address, then accepts
/// connections until a shutdown signal arrives, spawning one task per client.
pub async fn run(config: Config) -> Result<()> {
    let host = config.host.clone();
    let port = config.port;
    let state = ServerState::new(config);

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    info!("driftdb listening on {host}:{port}");

    let (shutdown_tx, _) = broadcast::channel(1);
    let mut client_tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = await_shutdown_signal() => {
                break;
            }

            res = listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        info!(%addr, "accepted connection");
                        let session_id = state.next_session_id();
                        let state = state.clone();
                        let shutdown_rx = shutdown_tx.subscribe();
                        client_tasks.spawn(async move {
                            let mut handler = ConnectionHandler::new(socket, addr, state, session_id, shutdown_rx);
                            handler.run().await;
                        });
                    }
                    Err(e) => error!("failed to accept connection: {e}"),
                }
            }

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("a connection handler panicked: {e:?}");
                }
            }
        }
    }

    info!("shutting down, notifying active connections");
    if shutdown_tx.send(()).is_err() {
        warn!("no active connections were listening for shutdown");
    }
    client_tasks.shutdown().await;
    info!("shutdown complete");
    Ok(())
}
