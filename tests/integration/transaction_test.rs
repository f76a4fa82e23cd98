// tests/integration/transaction_test.rs

//! End-to-end coverage of spec.md §8's concrete scenarios (S1-S4, S6) and a
//! handful of the round-trip/idempotence properties, driven entirely through
//! `dispatch_command` rather than calling `TransactionManager`/`WatchRegistry`
//! directly — these tests exercise the same seam a real connection does.

use super::test_helpers::TestContext;
use driftdb::core::RespValue;

fn bulk(s: &str) -> RespValue {
    RespValue::BulkString(s.as_bytes().to_vec().into())
}

// ===== S1: CAS abort =====

#[tokio::test]
async fn s1_watched_key_touched_by_another_client_aborts_exec_with_null_array() {
    let ctx = TestContext::new().await;
    let mut a = ctx.new_session();
    let mut b = ctx.new_session();

    ctx.run(&mut a, &["WATCH", "x"]).await;
    ctx.run(&mut a, &["MULTI"]).await;
    assert_eq!(ctx.run(&mut a, &["GET", "x"]).await, RespValue::SimpleString("QUEUED".into()));

    // Another client mutates the watched key before A's EXEC.
    assert_eq!(ctx.run(&mut b, &["SET", "x", "1"]).await, RespValue::ok());

    let reply = ctx.run(&mut a, &["EXEC"]).await;
    assert_eq!(reply, RespValue::NullArray);

    // The queue and watches are cleared; a second EXEC is rejected outright.
    assert_eq!(
        ctx.run(&mut a, &["EXEC"]).await,
        RespValue::Error("ERR EXEC without MULTI".to_string())
    );
}

// ===== S2: queue-time error aborts, nothing in the block runs =====

#[tokio::test]
async fn s2_unknown_command_while_queueing_sets_dirty_exec_and_execabort_fires() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();

    ctx.run(&mut client, &["MULTI"]).await;
    let bad = ctx.run(&mut client, &["INVALIDCMD"]).await;
    assert_eq!(bad, RespValue::Error("ERR unknown command 'INVALIDCMD'".to_string()));

    let queued = ctx.run(&mut client, &["GET", "y"]).await;
    assert_eq!(queued, RespValue::SimpleString("QUEUED".to_string()));

    let reply = ctx.run(&mut client, &["EXEC"]).await;
    assert_eq!(
        reply,
        RespValue::Error("EXECABORT Transaction discarded because of previous errors.".to_string())
    );

    // Nothing in the (aborted) block ran: y was never set or touched.
    assert_eq!(ctx.run(&mut client, &["GET", "y"]).await, RespValue::Null);
}

// ===== S3: execution-time error doesn't abort the rest of the block =====

#[tokio::test]
async fn s3_execution_time_error_is_reported_per_command_not_aborted() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();

    ctx.run(&mut client, &["SET", "a", "s"]).await;

    ctx.run(&mut client, &["MULTI"]).await;
    ctx.run(&mut client, &["INCR", "a"]).await;
    ctx.run(&mut client, &["SET", "b", "1"]).await;

    let reply = ctx.run(&mut client, &["EXEC"]).await;
    match reply {
        RespValue::Array(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0], RespValue::Error("ERR value is not an integer or out of range".to_string()));
            assert_eq!(items[1], RespValue::ok());
        }
        other => panic!("expected a 2-element array, got {other:?}"),
    }

    assert_eq!(ctx.run(&mut client, &["GET", "b"]).await, bulk("1"));
}

// ===== S4: nested MULTI =====

#[tokio::test]
async fn s4_nested_multi_is_rejected_and_first_transaction_state_is_preserved() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();

    assert_eq!(ctx.run(&mut client, &["MULTI"]).await, RespValue::ok());
    let second = ctx.run(&mut client, &["MULTI"]).await;
    assert_eq!(second, RespValue::Error("ERR MULTI calls can not be nested".to_string()));

    // The original transaction is still open and usable.
    assert_eq!(ctx.run(&mut client, &["GET", "z"]).await, RespValue::SimpleString("QUEUED".to_string()));
    let reply = ctx.run(&mut client, &["EXEC"]).await;
    assert_eq!(reply, RespValue::Array(vec![RespValue::Null]));
}

// ===== S6: FLUSHDB invalidates a watch on an existing key =====

#[tokio::test]
async fn s6_flushdb_by_another_client_invalidates_a_watched_existing_key() {
    let ctx = TestContext::new().await;
    let mut a = ctx.new_session();
    let mut b = ctx.new_session();

    assert_eq!(ctx.run(&mut a, &["SET", "k", "v"]).await, RespValue::ok());
    ctx.run(&mut a, &["WATCH", "k"]).await;

    assert_eq!(ctx.run(&mut b, &["FLUSHDB"]).await, RespValue::ok());

    ctx.run(&mut a, &["MULTI"]).await;
    ctx.run(&mut a, &["GET", "k"]).await;
    let reply = ctx.run(&mut a, &["EXEC"]).await;
    assert_eq!(reply, RespValue::NullArray);
}

#[tokio::test]
async fn flushdb_on_a_nonexistent_watched_key_does_not_invalidate() {
    let ctx = TestContext::new().await;
    let mut a = ctx.new_session();
    let mut b = ctx.new_session();

    ctx.run(&mut a, &["WATCH", "ghost"]).await;
    assert_eq!(ctx.run(&mut b, &["FLUSHDB"]).await, RespValue::ok());

    ctx.run(&mut a, &["MULTI"]).await;
    ctx.run(&mut a, &["GET", "ghost"]).await;
    let reply = ctx.run(&mut a, &["EXEC"]).await;
    assert_eq!(reply, RespValue::Array(vec![RespValue::Null]));
}

// ===== Round-trip / idempotence properties =====

#[tokio::test]
async fn property_multi_then_discard_returns_to_pre_multi_state() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();

    ctx.run(&mut client, &["WATCH", "k"]).await;
    ctx.run(&mut client, &["MULTI"]).await;
    ctx.run(&mut client, &["GET", "k"]).await;
    assert_eq!(ctx.run(&mut client, &["DISCARD"]).await, RespValue::ok());

    // No longer in a transaction.
    assert_eq!(
        ctx.run(&mut client, &["EXEC"]).await,
        RespValue::Error("ERR EXEC without MULTI".to_string())
    );
}

#[tokio::test]
async fn property_watch_then_unwatch_is_a_no_op_for_subsequent_touches() {
    let ctx = TestContext::new().await;
    let mut a = ctx.new_session();
    let mut b = ctx.new_session();

    ctx.run(&mut a, &["WATCH", "k"]).await;
    assert_eq!(ctx.run(&mut a, &["UNWATCH"]).await, RespValue::ok());

    assert_eq!(ctx.run(&mut b, &["SET", "k", "v"]).await, RespValue::ok());

    ctx.run(&mut a, &["MULTI"]).await;
    ctx.run(&mut a, &["GET", "k"]).await;
    let reply = ctx.run(&mut a, &["EXEC"]).await;
    assert_eq!(reply, RespValue::Array(vec![bulk("v")]));
}

#[tokio::test]
async fn unwatch_clears_dirty_cas_but_a_prior_queueing_error_still_aborts() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();
    let mut other = ctx.new_session();

    ctx.run(&mut client, &["WATCH", "k"]).await;
    ctx.run(&mut client, &["MULTI"]).await;
    ctx.run(&mut client, &["NOPE"]).await; // sets DIRTY_EXEC

    assert_eq!(ctx.run(&mut other, &["SET", "k", "v"]).await, RespValue::ok()); // sets DIRTY_CAS

    // UNWATCH is issued mid-MULTI via the binding layer's own dispatch path;
    // it is unconditional, so it's allowed even while IN_MULTI.
    assert_eq!(ctx.run(&mut client, &["UNWATCH"]).await, RespValue::ok());

    let reply = ctx.run(&mut client, &["EXEC"]).await;
    assert_eq!(
        reply,
        RespValue::Error("EXECABORT Transaction discarded because of previous errors.".to_string())
    );
}

#[tokio::test]
async fn a_write_queued_is_actually_applied_exactly_once_on_successful_exec() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();

    ctx.run(&mut client, &["MULTI"]).await;
    ctx.run(&mut client, &["SET", "counter", "0"]).await;
    ctx.run(&mut client, &["INCR", "counter"]).await;
    ctx.run(&mut client, &["INCR", "counter"]).await;
    let reply = ctx.run(&mut client, &["EXEC"]).await;
    assert_eq!(
        reply,
        RespValue::Array(vec![RespValue::ok(), RespValue::Integer(1), RespValue::Integer(2)])
    );
    assert_eq!(ctx.run(&mut client, &["GET", "counter"]).await, bulk("2"));
}
