// src/core/replication.rs

//! The minimal replication surface the EXEC algorithm needs: just enough of
//! this node's replication role to decide whether queued writes must be
//! rejected, plus a backlog to append the literal synthetic-EXEC bytes to.
//! Full replication transport (PSYNC, the streaming protocol, partial
//! resync) is out of scope.

use crate::core::protocol::SYNTHETIC_EXEC_BYTES;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

/// This server's replication role, mirroring
/// `spineldb::config::ReplicationConfig`'s shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationRole {
    Primary,
    Replica {
        primary_host: String,
        primary_port: u16,
    },
}

impl Default for ReplicationRole {
    fn default() -> Self {
        Self::Primary
    }
}

impl From<crate::config::ReplicationConfig> for ReplicationRole {
    fn from(config: crate::config::ReplicationConfig) -> Self {
        match config {
            crate::config::ReplicationConfig::Primary => Self::Primary,
            crate::config::ReplicationConfig::Replica {
                primary_host,
                primary_port,
            } => Self::Replica {
                primary_host,
                primary_port,
            },
        }
    }
}

/// The maximum number of bytes the replication backlog retains. Grounded on
/// `spineldb::core::replication::backlog::ReplicationBacklog`'s ring-buffer
/// shape, sized down since this crate only ever appends the fixed
/// `SYNTHETIC_EXEC_BYTES` marker to it, never full command streams.
const BACKLOG_CAPACITY: usize = 64 * 1024;

/// Replication-facing state: the current role, whether this is the
/// master-link feed client, and the backlog used to propagate a completed
/// EXEC downstream.
#[derive(Debug)]
pub struct ReplicationState {
    role: Mutex<ReplicationRole>,
    /// Non-loading, replica-read-only gate: set false while an RDB/SPLDB
    /// load is in progress, so EXEC's read-only check doesn't reject writes
    /// during initial sync replay.
    is_loading: Mutex<bool>,
    /// Whether queued writes are rejected on a read-only replica. This is a
    /// server-wide config flag (`replica-read-only`), not per-role.
    replica_read_only: Mutex<bool>,
    backlog: Mutex<VecDeque<u8>>,
}

impl ReplicationState {
    pub fn new(role: ReplicationRole, replica_read_only: bool) -> Self {
        Self {
            role: Mutex::new(role),
            is_loading: Mutex::new(false),
            replica_read_only: Mutex::new(replica_read_only),
            backlog: Mutex::new(VecDeque::new()),
        }
    }

    pub fn role(&self) -> ReplicationRole {
        self.role.lock().clone()
    }

    pub fn set_role(&self, role: ReplicationRole) {
        *self.role.lock() = role;
    }

    pub fn is_loading(&self) -> bool {
        *self.is_loading.lock()
    }

    pub fn set_loading(&self, loading: bool) {
        *self.is_loading.lock() = loading;
    }

    pub fn replica_read_only(&self) -> bool {
        *self.replica_read_only.lock()
    }

    /// `EXEC`'s read-only-replica check: the role is a non-loading replica,
    /// `replica-read-only` is configured, and the client issuing EXEC is
    /// not the master-feed client itself (the master-feed client must
    /// always be allowed to apply replicated writes even while this node is
    /// technically read-only).
    pub fn rejects_writes(&self, is_master_link_client: bool) -> bool {
        if is_master_link_client || self.is_loading() {
            return false;
        }
        matches!(self.role(), ReplicationRole::Replica { .. }) && self.replica_read_only()
    }

    /// Forwards a synthetic `MULTI` to the replication/AOF propagation path,
    /// so the replicated block reads atomically. Full propagation transport
    /// is out of scope; this is the call into it, a no-op-if-absent hook
    /// that logs at debug level so the EXEC commit path has a concrete
    /// destination to call regardless of whether a backlog is attached.
    pub fn propagate_synthetic_multi(&self, db_index: usize) {
        debug!(db_index, "propagating synthetic MULTI ahead of transaction block");
    }

    /// Appends the literal wire bytes for a synthetic `EXEC` to the backlog.
    /// Preserve these bytes exactly.
    pub fn append_synthetic_exec_to_backlog(&self) {
        let mut backlog = self.backlog.lock();
        backlog.extend(SYNTHETIC_EXEC_BYTES);
        let overflow = backlog.len().saturating_sub(BACKLOG_CAPACITY);
        if overflow > 0 {
            backlog.drain(..overflow);
        }
    }

    #[cfg(test)]
    pub fn backlog_tail(&self, n: usize) -> Vec<u8> {
        let backlog = self.backlog.lock();
        backlog.iter().rev().take(n).rev().copied().collect()
    }
}

impl Default for ReplicationState {
    fn default() -> Self {
        Self::new(ReplicationRole::default(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_never_rejects_writes() {
        let repl = ReplicationState::new(ReplicationRole::Primary, true);
        assert!(!repl.rejects_writes(false));
    }

    #[test]
    fn read_only_replica_rejects_writes_from_regular_clients() {
        let repl = ReplicationState::new(
            ReplicationRole::Replica {
                primary_host: "127.0.0.1".into(),
                primary_port: 6380,
            },
            true,
        );
        assert!(repl.rejects_writes(false));
        assert!(!repl.rejects_writes(true), "the master-link client is exempt");
    }

    #[test]
    fn loading_replica_does_not_reject_writes() {
        let repl = ReplicationState::new(
            ReplicationRole::Replica {
                primary_host: "127.0.0.1".into(),
                primary_port: 6380,
            },
            true,
        );
        repl.set_loading(true);
        assert!(!repl.rejects_writes(false));
    }

    #[test]
    fn synthetic_exec_bytes_are_preserved_exactly() {
        let repl = ReplicationState::default();
        repl.append_synthetic_exec_to_backlog();
        assert_eq!(repl.backlog_tail(14), SYNTHETIC_EXEC_BYTES);
    }
}
