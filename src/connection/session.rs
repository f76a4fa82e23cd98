// src/connection/session.rs

//! Per-connection session state: the identity and bookkeeping a connection
//! handler threads through every command it dispatches. Scoped down from
//! `spineldb::connection::session::SessionState`: no auth, pubsub, or ACL
//! surface, just the fields the transaction engine and slow log need.

/// Holds the state specific to a single client connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable identity for this connection, handed out by
    /// `ServerState::next_session_id` and used as the key into the
    /// transaction manager and watch registry.
    pub session_id: u64,
    /// The index of the database this session currently has selected.
    pub db_index: usize,
    /// `ip:port` of the peer, captured once at accept time. Recorded on
    /// every slow log entry.
    pub peer_id: String,
    /// The name set via `CLIENT SETNAME` (out of scope here, so always
    /// empty), recorded on every slow log entry.
    pub client_name: String,
    /// True only for the internal session that feeds replicated commands
    /// from this node's master link. Exempts EXEC from the read-only-replica
    /// write rejection, since replicated writes must always apply.
    pub is_master_link: bool,
}

impl Session {
    pub fn new(session_id: u64, peer_id: String) -> Self {
        Self {
            session_id,
            db_index: 0,
            peer_id,
            client_name: String::new(),
            is_master_link: false,
        }
    }
}
