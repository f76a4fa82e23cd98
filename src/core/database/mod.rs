// src/core/database/mod.rs

pub mod context;
pub mod core;
pub mod locking;
pub mod shard;
pub mod transaction;
pub mod watch;

pub use context::ExecutionContext;
pub use core::{Db, NUM_SHARDS};
pub use locking::ExecutionLocks;
pub use shard::{DbShard, ShardCache, StoredValue};
pub use transaction::{QueuedCommand, TransactionManager, TransactionState};
pub use watch::{WatchRegistry, WatchedKey};
