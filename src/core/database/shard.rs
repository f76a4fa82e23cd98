// src/core/database/shard.rs

//! A single shard of the keyspace: a lockable slice of the key space, so that
//! concurrent commands touching unrelated keys don't serialize on one mutex.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;

/// A minimal stored value: this crate's keyspace stand-in only needs to
/// carry a string/integer payload far enough to drive WATCH/touch and EXEC
/// write semantics end to end, not a general-purpose value type system.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub data: Bytes,
    pub expires_at: Option<Instant>,
}

impl StoredValue {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

pub type ShardCache = HashMap<Bytes, StoredValue>;

/// One lockable slice of a `Db`'s keyspace.
#[derive(Debug, Default)]
pub struct DbShard {
    pub entries: Mutex<ShardCache>,
    pub key_count: AtomicU64,
}

impl DbShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_count(&self) {
        self.key_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr_count(&self) {
        self.key_count.fetch_sub(1, Ordering::Relaxed);
    }
}
