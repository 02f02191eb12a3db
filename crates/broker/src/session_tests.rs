// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn prompt_line_requires_word_char_before_marker() {
    assert!(is_prompt_line("user@host:~$"));
    assert!(is_prompt_line("PS C:\\> "));
    assert!(!is_prompt_line("plain text >"));
    assert!(!is_prompt_line(">"));
    assert!(!is_prompt_line(""));
}

#[test]
fn mostly_printable_threshold() {
    assert!(is_mostly_printable("ls -la"));
    assert!(!is_mostly_printable("\x01\x02\x03ok"));
}

#[test]
fn normalize_write_payload_converts_newlines_to_cr() {
    assert_eq!(normalize_write_payload(b"abc\n"), b"abc\r".to_vec());
    assert_eq!(normalize_write_payload(b"abc\r\n"), b"abc\r".to_vec());
    assert_eq!(normalize_write_payload(b"a\rb\nc"), b"a\rb\rc".to_vec());
}

#[test]
fn alt_screen_enter_and_exit_toggle_flag() {
    let mut flag = false;
    scan_alt_screen(b"\x1b[?1049h", &mut flag);
    assert!(flag);
    scan_alt_screen(b"\x1b[?1049l", &mut flag);
    assert!(!flag);
}

#[test]
fn alt_screen_ignores_unrelated_escape_sequences() {
    let mut flag = false;
    scan_alt_screen(b"\x1b[31mred\x1b[0m", &mut flag);
    assert!(!flag);
}

#[test]
fn last_logical_line_skips_blank_trailing_lines() {
    assert_eq!(
        last_logical_line("ls -la\r\n"),
        Some("ls -la".to_string())
    );
    assert_eq!(last_logical_line("\r\n\r\n"), None);
}

#[test]
fn merge_env_defaults_lets_overrides_win() {
    let merged = merge_env_defaults(&[("TERM".to_string(), "dumb".to_string())]);
    assert_eq!(
        merged.iter().find(|(k, _)| k == "TERM").map(|(_, v)| v.as_str()),
        Some("dumb")
    );
    assert!(merged.iter().any(|(k, _)| k == "LANG"));
}
