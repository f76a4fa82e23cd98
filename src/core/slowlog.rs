// src/core/slowlog.rs

//! The slow query log: a fixed-capacity FIFO of recently observed command
//! executions whose duration crossed a configurable admission threshold.
//!
//! Grounded on `spineldb::core::latency::LatencyMonitor`'s storage shape
//! (`VecDeque` behind a `parking_lot::Mutex`, a monotonic id counter) but
//! restructured to match the admission/truncation/identity contract of the
//! reference `slowlog.c` implementation exactly: `LatencyMonitor` records
//! unconditionally and never truncates argv or string payloads, whereas this
//! log gates on a threshold and truncates both.

use crate::core::protocol::RespValue;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Part of the wire contract for slow log consumers.
pub const MAX_ARGC: usize = 32;
pub const MAX_STRING: usize = 128;

#[derive(Debug, Clone)]
pub struct SlowLogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub duration_us: u64,
    pub argv: Vec<Bytes>,
    pub peer_id: String,
    pub client_name: String,
}

impl SlowLogEntry {
    fn new(
        id: u64,
        duration_us: u64,
        argv: &[Bytes],
        peer_id: String,
        client_name: String,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut stored: Vec<Bytes> = Vec::with_capacity(argv.len().min(MAX_ARGC));
        let total = argv.len();
        if total > MAX_ARGC {
            stored.extend(argv[..MAX_ARGC - 1].iter().map(|a| truncate_arg(a)));
            let remaining = total - (MAX_ARGC - 1);
            stored.push(Bytes::from(format!("... ({remaining} more arguments)")));
        } else {
            stored.extend(argv.iter().map(|a| truncate_arg(a)));
        }

        Self {
            id,
            timestamp,
            duration_us,
            argv: stored,
            peer_id,
            client_name,
        }
    }
}

/// Truncates a single argument to `MAX_STRING` bytes, appending a marker of
/// how many bytes were dropped. Short arguments are cloned as-is: `Bytes`
/// clones are ref-counted, so this never deep-copies live keyspace data.
fn truncate_arg(arg: &Bytes) -> Bytes {
    if arg.len() <= MAX_STRING {
        return arg.clone();
    }
    let mut out = Vec::with_capacity(MAX_STRING + 24);
    out.extend_from_slice(&arg[..MAX_STRING]);
    out.extend_from_slice(format!("... ({} more bytes)", arg.len() - MAX_STRING).as_bytes());
    Bytes::from(out)
}

#[derive(Debug, Default)]
pub struct SlowLog {
    entries: Mutex<VecDeque<SlowLogEntry>>,
    next_id: AtomicU64,
}

impl SlowLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `push_if_needed`: gated by `log_slower_than` (negative disables
    /// admission entirely); trims from the tail once over `max_len`.
    pub fn push_if_needed(
        &self,
        peer_id: &str,
        client_name: &str,
        argv: &[Bytes],
        duration_us: u64,
        log_slower_than: i64,
        max_len: usize,
    ) {
        if log_slower_than < 0 || duration_us < log_slower_than as u64 {
            return;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = SlowLogEntry::new(
            id,
            duration_us,
            argv,
            peer_id.to_string(),
            client_name.to_string(),
        );
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        while entries.len() > max_len {
            entries.pop_back();
        }
    }

    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `count` entries head-to-tail (newest first).
    pub fn get(&self, count: usize) -> Vec<SlowLogEntry> {
        self.entries.lock().iter().take(count).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(strings: &[&str]) -> Vec<Bytes> {
        strings.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn entries_below_threshold_are_not_logged() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["GET", "k"]), 50, 100, 128);
        assert!(log.is_empty());
    }

    #[test]
    fn negative_threshold_disables_logging_entirely() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["GET", "k"]), 1_000_000, -1, 128);
        assert!(log.is_empty());
    }

    #[test]
    fn zero_threshold_logs_every_command() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["PING"]), 0, 0, 128);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn newest_entry_is_returned_first() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["GET", "a"]), 200, 100, 128);
        log.push_if_needed("peer", "", &argv(&["GET", "b"]), 200, 100, 128);
        let entries = log.get(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].argv[1], Bytes::from_static(b"b"));
        assert_eq!(entries[1].argv[1], Bytes::from_static(b"a"));
        assert!(entries[0].id > entries[1].id, "ids keep increasing even as order flips");
    }

    #[test]
    fn reset_clears_the_log_but_not_the_id_counter() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["GET", "a"]), 200, 100, 128);
        let first_id = log.get(1)[0].id;
        log.reset();
        assert!(log.is_empty());

        log.push_if_needed("peer", "", &argv(&["GET", "b"]), 200, 100, 128);
        assert_eq!(log.get(1)[0].id, first_id + 1);
    }

    #[test]
    fn oldest_entries_are_dropped_once_over_max_len() {
        let log = SlowLog::new();
        for i in 0..5 {
            log.push_if_needed("peer", "", &argv(&["GET", &i.to_string()]), 200, 100, 3);
        }
        assert_eq!(log.len(), 3);
        let entries = log.get(3);
        // newest-first: the three most recently pushed survive
        assert_eq!(entries[0].argv[1], Bytes::from_static(b"4"));
        assert_eq!(entries[2].argv[1], Bytes::from_static(b"2"));
    }

    #[test]
    fn argv_over_max_argc_is_collapsed_with_a_count_marker() {
        let log = SlowLog::new();
        let many: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
        log.push_if_needed("peer", "", &argv(&refs), 200, 100, 128);

        let entry = &log.get(1)[0];
        assert_eq!(entry.argv.len(), MAX_ARGC);
        let marker = std::str::from_utf8(&entry.argv[MAX_ARGC - 1]).unwrap();
        assert!(marker.contains("more arguments"));
        // 40 total, MAX_ARGC - 1 = 31 kept verbatim, 9 folded into the marker.
        assert!(marker.contains('9'));
    }

    #[test]
    fn long_strings_are_truncated_with_a_byte_count_marker() {
        let log = SlowLog::new();
        let long_value = "x".repeat(MAX_STRING + 50);
        log.push_if_needed("peer", "", &argv(&["SET", "k", &long_value]), 200, 100, 128);

        let entry = &log.get(1)[0];
        let stored = &entry.argv[2];
        assert!(stored.len() < long_value.len());
        assert!(std::str::from_utf8(stored).unwrap().ends_with("(50 more bytes)"));
    }

    #[test]
    fn short_strings_are_preserved_exactly() {
        let log = SlowLog::new();
        log.push_if_needed("peer", "", &argv(&["GET", "short"]), 200, 100, 128);
        let entry = &log.get(1)[0];
        assert_eq!(entry.argv[1], Bytes::from_static(b"short"));
    }
}

impl SlowLogEntry {
    pub fn to_resp(&self) -> RespValue {
        RespValue::Array(vec![
            RespValue::Integer(self.id as i64),
            RespValue::Integer(self.timestamp),
            RespValue::Integer(self.duration_us as i64),
            RespValue::Array(
                self.argv
                    .iter()
                    .cloned()
                    .map(RespValue::BulkString)
                    .collect(),
            ),
            RespValue::BulkString(Bytes::from(self.peer_id.clone())),
            RespValue::BulkString(Bytes::from(self.client_name.clone())),
        ])
    }
}
