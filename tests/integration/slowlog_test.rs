// tests/integration/slowlog_test.rs

//! End-to-end coverage of spec.md §8's S5 scenario and the SLOWLOG command
//! bindings, driven through `dispatch_command`. Admission is exercised
//! directly against `state.slowlog` (as the unit tests in `core::slowlog`
//! already do for timing-sensitive cases) rather than via `sleep`, since a
//! real clock can't be trusted to land on exact microsecond thresholds in CI.

use super::test_helpers::TestContext;
use bytes::Bytes;
use driftdb::core::RespValue;

fn argv(parts: &[&str]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::from(p.to_string())).collect()
}

// ===== S5: admission gating and capacity trimming =====

#[tokio::test]
async fn s5_only_entries_at_or_above_the_threshold_survive_and_newest_wins_capacity() {
    let ctx = TestContext::new().await;

    ctx.state.slowlog.push_if_needed("peer", "", &argv(&["GET", "a"]), 500, 1000, 2);
    ctx.state.slowlog.push_if_needed("peer", "", &argv(&["GET", "b"]), 1500, 1000, 2);
    ctx.state.slowlog.push_if_needed("peer", "", &argv(&["GET", "c"]), 2500, 1000, 2);

    let mut client = ctx.new_session();
    assert_eq!(ctx.run(&mut client, &["SLOWLOG", "LEN"]).await, RespValue::Integer(2));

    let reply = ctx.run(&mut client, &["SLOWLOG", "GET"]).await;
    match reply {
        RespValue::Array(entries) => {
            assert_eq!(entries.len(), 2);
            let (first_id, first_argv) = unpack(&entries[0]);
            let (second_id, second_argv) = unpack(&entries[1]);
            assert_eq!(first_argv[1], "c");
            assert_eq!(second_argv[1], "b");
            assert!(first_id > second_id, "the newest entry has the larger id");
            assert_eq!(first_id, second_id + 1);
        }
        other => panic!("expected an array, got {other:?}"),
    }
}

fn unpack(entry: &RespValue) -> (i64, Vec<String>) {
    let RespValue::Array(fields) = entry else {
        panic!("expected a 6-element slow log entry");
    };
    assert_eq!(fields.len(), 6);
    let RespValue::Integer(id) = fields[0] else {
        panic!("expected an integer id");
    };
    let RespValue::Array(argv) = &fields[3] else {
        panic!("expected an argv array");
    };
    let strings = argv
        .iter()
        .map(|v| match v {
            RespValue::BulkString(b) => String::from_utf8(b.to_vec()).unwrap(),
            other => panic!("expected a bulk string argv element, got {other:?}"),
        })
        .collect();
    (id, strings)
}

#[tokio::test]
async fn negative_log_slower_than_disables_admission_entirely() {
    let ctx = TestContext::new().await;
    ctx.state.slowlog.push_if_needed("peer", "", &argv(&["GET", "a"]), 1_000_000, -1, 128);
    assert!(ctx.state.slowlog.is_empty());
}

// ===== SLOWLOG LEN / RESET / HELP bindings =====

#[tokio::test]
async fn slowlog_reset_then_len_is_zero() {
    let ctx = TestContext::new().await;
    ctx.state.slowlog.push_if_needed("peer", "", &argv(&["GET", "a"]), 2_000, 1_000, 128);

    let mut client = ctx.new_session();
    assert_eq!(ctx.run(&mut client, &["SLOWLOG", "RESET"]).await, RespValue::ok());
    assert_eq!(ctx.run(&mut client, &["SLOWLOG", "LEN"]).await, RespValue::Integer(0));
}

#[tokio::test]
async fn slowlog_get_respects_an_explicit_count() {
    let ctx = TestContext::new().await;
    for i in 0..5 {
        ctx.state.slowlog.push_if_needed(
            "peer",
            "",
            &argv(&["GET", &i.to_string()]),
            2_000,
            1_000,
            128,
        );
    }

    let mut client = ctx.new_session();
    let reply = ctx.run(&mut client, &["SLOWLOG", "GET", "3"]).await;
    match reply {
        RespValue::Array(entries) => assert_eq!(entries.len(), 3),
        other => panic!("expected an array, got {other:?}"),
    }
}

#[tokio::test]
async fn slowlog_help_returns_a_nonempty_static_help_array() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();
    let reply = ctx.run(&mut client, &["SLOWLOG", "HELP"]).await;
    match reply {
        RespValue::Array(lines) => assert!(!lines.is_empty()),
        other => panic!("expected an array, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_slowlog_subcommand_is_a_syntax_error() {
    let ctx = TestContext::new().await;
    let mut client = ctx.new_session();
    let reply = ctx.run(&mut client, &["SLOWLOG", "BOGUS"]).await;
    assert!(matches!(reply, RespValue::Error(_)));
}

// ===== Slow log admission driven by real dispatch, end to end =====

#[tokio::test]
async fn every_dispatched_command_is_offered_to_the_slow_log() {
    let ctx = TestContext::new().await;
    {
        let mut cfg = ctx.state.config.lock().await;
        cfg.slowlog.log_slower_than = 0; // log everything, including PING
        cfg.slowlog.max_len = 128;
    }

    let mut client = ctx.new_session();
    assert!(ctx.state.slowlog.is_empty());
    ctx.run(&mut client, &["PING"]).await;
    assert_eq!(ctx.state.slowlog.len(), 1);
    ctx.run(&mut client, &["SET", "k", "v"]).await;
    assert_eq!(ctx.state.slowlog.len(), 2);
}
