// tests/integration_test.rs

//! Integration tests exercising the transaction engine and slow query log
//! end to end, through `dispatch_command`, against a real (in-process)
//! `ServerState` rather than calling module internals directly.

mod integration {
    pub mod slowlog_test;
    pub mod test_helpers;
    pub mod transaction_test;
}
