// src/core/commands/generic/mod.rs

//! Transaction-control and introspection verbs: MULTI, EXEC, DISCARD, WATCH,
//! UNWATCH, SLOWLOG. Each of these is thin: parsing and flags live here, but
//! the actual MULTI/EXEC/WATCH semantics are driven by
//! `crate::core::handler::transaction`, since they need access to session
//! state the command struct itself doesn't carry.

pub mod discard;
pub mod exec;
pub mod multi;
pub mod slowlog;
pub mod unwatch;
pub mod watch;

pub use discard::Discard;
pub use exec::Exec;
pub use multi::Multi;
pub use slowlog::{Slowlog, SlowlogSubcommand};
pub use unwatch::Unwatch;
pub use watch::Watch;
