// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn buf(capacity: usize) -> OutputBuffer {
    OutputBuffer::new(capacity, false, 150)
}

fn contents(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.content.as_str()).collect()
}

#[test]
fn empty_read() {
    let b = buf(10);
    let r = b.read(0, 100);
    assert!(r.entries.is_empty());
    assert!(!r.truncated);
    assert!(!r.has_more);
    assert_eq!(r.next_cursor, 0);
}

#[test]
fn sequential_writes() {
    let mut b = buf(10);
    b.append(b"one\ntwo\nthree\n");
    let r = b.read(0, 100);
    assert_eq!(contents(&r.entries), vec!["one", "two", "three"]);
    assert_eq!(r.entries[0].sequence, 1);
    assert_eq!(r.entries[2].sequence, 3);
    assert!(!r.truncated);
}

#[test]
fn partial_line_held_over() {
    let mut b = buf(10);
    b.append(b"hello wor");
    assert!(b.read(0, 100).entries.is_empty());
    b.append(b"ld\n");
    let r = b.read(0, 100);
    assert_eq!(contents(&r.entries), vec!["hello world"]);
}

#[test]
fn overwrite_full_buffer_sets_truncated() {
    let mut b = buf(3);
    b.append(b"1\n2\n3\n4\n");
    let r = b.read(0, 100);
    // capacity 3: entries for lines 2,3,4 retained
    assert_eq!(contents(&r.entries), vec!["2", "3", "4"]);
    assert!(r.truncated);
}

#[test]
fn since_within_retained_range_is_not_truncated() {
    let mut b = buf(3);
    b.append(b"1\n2\n3\n4\n");
    // since=1 ("entries after sequence 1") is fully satisfiable from
    // what remains (2,3,4); nothing requested was actually dropped.
    let r = b.read(1, 100);
    assert_eq!(contents(&r.entries), vec!["2", "3", "4"]);
    assert!(!r.truncated);
}

#[test]
fn since_too_new_returns_empty_without_truncation() {
    let mut b = buf(10);
    b.append(b"a\nb\n");
    let r = b.read(2, 100);
    assert!(r.entries.is_empty());
    assert!(!r.truncated);
    assert_eq!(r.next_cursor, 2);
}

#[test]
fn max_lines_caps_and_reports_has_more() {
    let mut b = buf(10);
    b.append(b"a\nb\nc\nd\n");
    let r = b.read(0, 2);
    assert_eq!(contents(&r.entries), vec!["a", "b"]);
    assert!(r.has_more);
    assert_eq!(r.next_cursor, 2);
}

#[test]
fn sequence_never_repeats_across_reads() {
    let mut b = buf(5);
    b.append(b"x\n");
    b.append(b"y\n");
    let r = b.read(0, 100);
    assert_eq!(r.entries[0].sequence, 1);
    assert_eq!(r.entries[1].sequence, 2);
}

#[test]
fn read_smart_head_tail_reports_omitted() {
    let mut b = buf(100);
    for i in 0..10 {
        b.append(format!("line{i}\n").as_bytes());
    }
    let r = b.read_smart(0, SmartMode::HeadTail, 100, 2, 2);
    assert_eq!(contents(&r.head), vec!["line0", "line1"]);
    assert_eq!(contents(&r.tail), vec!["line8", "line9"]);
    assert_eq!(r.lines_omitted, 6);
}

#[test]
fn get_latest_returns_last_n() {
    let mut b = buf(100);
    b.append(b"a\nb\nc\n");
    let latest = b.get_latest(2);
    assert_eq!(contents(&latest), vec!["b", "c"]);
}

#[test]
fn normalizes_crlf_and_bare_cr() {
    let mut b = buf(10);
    b.append(b"one\r\ntwo\rthree\n");
    let r = b.read(0, 100);
    assert_eq!(contents(&r.entries), vec!["one", "two", "three"]);
}

#[test]
fn coalesces_identical_spinner_frames() {
    let mut b = OutputBuffer::new(100, true, 50_000);
    b.append(b"Loading .\n");
    b.append(b"Loading .\n");
    let r = b.read(0, 100);
    // Coalesced: same sequence reused, no second entry appended.
    assert_eq!(r.entries.len(), 1);
    assert_eq!(r.entries[0].sequence, 1);
}
