// src/core/state.rs

//! Defines the central `ServerState` struct, holding all shared server-wide
//! state. Scaled down from the original server's `ServerState`: no ACL,
//! pubsub, cluster, scripting, or persistence subsystems, but the same
//! "one struct behind an `Arc`, passed to every connection handler" shape.

use crate::config::Config;
use crate::core::database::{Db, TransactionManager, WatchRegistry};
use crate::core::monitor::MonitorBus;
use crate::core::replication::ReplicationState;
use crate::core::slowlog::SlowLog;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// The central struct holding all shared, server-wide state. Wrapped in an
/// `Arc` and handed to every connection handler.
#[derive(Debug)]
pub struct ServerState {
    /// One entry per selectable database, each independently sharded.
    pub dbs: Vec<Arc<Db>>,
    /// The server's runtime configuration. Wrapped in a `Mutex` for parity
    /// with dynamic reconfiguration, even though this crate exposes no
    /// `CONFIG SET` equivalent yet.
    pub config: Mutex<Config>,
    /// Per-session transaction queues and dirty-flag bookkeeping.
    pub tx_manager: TransactionManager,
    /// The WATCH forward/reverse index, shared by every session.
    pub watch_registry: WatchRegistry,
    /// The bounded FIFO of slow command executions.
    pub slowlog: SlowLog,
    /// This node's replication role and propagation backlog.
    pub replication: ReplicationState,
    /// The MONITOR debug-client broadcast feed.
    pub monitor: MonitorBus,
    /// A monotonically increasing counter handed out as each connection's
    /// session id.
    next_session_id: AtomicU64,
    /// The server-wide dirty counter: incremented by every write, including
    /// the block total once per EXEC that propagated a synthetic MULTI.
    /// Stands in for the counter a persistence subsystem (out of scope here)
    /// would otherwise consult to decide when to trigger a background save.
    dirty_counter: AtomicU64,
}

impl ServerState {
    pub fn new(config: Config) -> Arc<Self> {
        let num_databases = config.databases;
        let replica_read_only = config.replica_read_only;
        let role = config.replication.clone().into();

        Arc::new(Self {
            dbs: (0..num_databases).map(|_| Arc::new(Db::new())).collect(),
            config: Mutex::new(config),
            tx_manager: TransactionManager::new(),
            watch_registry: WatchRegistry::new(num_databases),
            slowlog: SlowLog::new(),
            replication: ReplicationState::new(role, replica_read_only),
            monitor: MonitorBus::new(),
            next_session_id: AtomicU64::new(1),
            dirty_counter: AtomicU64::new(0),
        })
    }

    /// Increments the server dirty counter by `n`, as EXEC does once per
    /// committed block that propagated a synthetic MULTI.
    pub fn increment_dirty(&self, n: u64) {
        self.dirty_counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dirty_counter(&self) -> u64 {
        self.dirty_counter.load(Ordering::Relaxed)
    }

    /// Retrieves a reference to a specific database by its index.
    pub fn get_db(&self, db_index: usize) -> Option<Arc<Db>> {
        self.dbs.get(db_index).cloned()
    }

    pub fn num_databases(&self) -> usize {
        self.dbs.len()
    }

    /// Hands out a fresh, unique session id for a newly accepted connection.
    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Clears every piece of per-session state tracked outside the
    /// connection object itself. Called on disconnect.
    pub fn forget_session(&self, session_id: u64) {
        self.tx_manager.remove(session_id);
        self.watch_registry.unwatch_all(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_one_db_per_configured_database() {
        let mut config = Config::default();
        config.databases = 4;
        let state = ServerState::new(config);
        assert_eq!(state.dbs.len(), 4);
        assert!(state.get_db(3).is_some());
        assert!(state.get_db(4).is_none());
    }

    #[test]
    fn session_ids_are_unique_and_increasing() {
        let state = ServerState::new(Config::default());
        let a = state.next_session_id();
        let b = state.next_session_id();
        assert!(b > a);
    }
}
