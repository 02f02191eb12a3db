// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn normalize_delta_collapses_blank_runs_and_duplicates() {
    let input = "a\n\n\n\n\nb\nb\nb\nc";
    let normalized = normalize_delta(input, false);
    assert_eq!(normalized, "a\n\n\n\nb\nc");
}

#[test]
fn normalize_delta_strips_spinner_frames() {
    let input = "working\n|\n/\n-\ndone";
    let normalized = normalize_delta(input, true);
    assert_eq!(normalized, "working\ndone");
}

#[test]
fn dedupe_command_echo_keeps_first_occurrence() {
    let mut lines = vec!["ls -la".to_string(), "file.txt".to_string(), "ls -la".to_string()];
    dedupe_command_echo(&mut lines);
    assert_eq!(lines, vec!["ls -la".to_string(), "file.txt".to_string()]);
}

#[test]
fn truncate_response_keeps_head_and_tail_with_marker() {
    let text: String = "x".repeat(200_000);
    let (truncated, was_truncated) = truncate_response(text);
    assert!(was_truncated);
    assert!(truncated.contains("Output Truncated"));
    assert!(truncated.chars().count() < 200_000);
}

#[test]
fn truncate_response_leaves_short_text_untouched() {
    let (text, was_truncated) = truncate_response("hello".to_string());
    assert_eq!(text, "hello");
    assert!(!was_truncated);
}

#[test]
fn compile_pattern_escapes_plain_text() {
    let re = compile_pattern("a.b", false, true).unwrap();
    assert!(re.is_match("a.b"));
    assert!(!re.is_match("axb"));
}

#[test]
fn compile_pattern_is_case_insensitive_by_default() {
    let re = compile_pattern("done", false, false).unwrap();
    assert!(re.is_match("DONE"));
}
