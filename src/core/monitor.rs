// src/core/monitor.rs

//! A minimal stand-in for the MONITOR debug-client feed. EXEC forwards a
//! notification at well-defined points in its commit algorithm regardless of
//! whether any MONITOR client happens to be attached; this bus is that
//! destination, grounded on `spineldb::core::events::EventBus`'s
//! broadcast-channel shape but scoped to just one observable event: a
//! completed EXEC.

use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::trace;

/// The capacity of the monitor broadcast channel. Lagging subscribers simply
/// miss old entries (`broadcast::error::RecvError::Lagged`); this is a
/// debug feed, not a durable log.
const MONITOR_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct MonitorEvent {
    pub timestamp_secs: f64,
    pub session_id: u64,
    pub db_index: usize,
    /// A human-readable rendering of the command, e.g. `"EXEC"` or `"MULTI"`.
    pub command: String,
}

#[derive(Debug)]
pub struct MonitorBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(MONITOR_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publishes a notification. Called for EXEC (success, abort, and
    /// CAS-failure paths alike) *after* any queued commands have been
    /// dispatched, so monitors observe the natural wire order: MULTI, EXEC,
    /// [queued commands].
    pub fn notify(&self, session_id: u64, db_index: usize, command: &str) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        let timestamp_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let event = MonitorEvent {
            timestamp_secs,
            session_id,
            db_index,
            command: command.to_string(),
        };
        trace!(session_id, db_index, command, "monitor notify");
        // A send error just means there are no receivers left; nothing to do.
        let _ = self.sender.send(event);
    }
}

impl Default for MonitorBus {
    fn default() -> Self {
        Self::new()
    }
}
