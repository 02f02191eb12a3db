// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn special_operations() {
    assert_eq!(encode_key("ctrl_c").unwrap(), vec![0x03]);
    assert_eq!(encode_key("ctrl_z").unwrap(), vec![0x1A]);
    assert_eq!(encode_key("ctrl_d").unwrap(), vec![0x04]);
    assert_eq!(encode_key("esc").unwrap(), vec![0x1B]);
    assert_eq!(encode_key("enter").unwrap(), vec![0x0D]);
    assert_eq!(encode_key("return").unwrap(), vec![0x0D]);
    assert_eq!(encode_key("double_esc").unwrap(), vec![0x1B, 0x1B]);
}

#[test]
fn navigation_keys() {
    assert_eq!(encode_key("up").unwrap(), b"\x1B[A".to_vec());
    assert_eq!(encode_key("left").unwrap(), b"\x1B[D".to_vec());
    assert_eq!(encode_key("home").unwrap(), b"\x1B[H".to_vec());
    assert_eq!(encode_key("delete").unwrap(), b"\x1B[3~".to_vec());
    assert_eq!(encode_key("del").unwrap(), b"\x1B[3~".to_vec());
}

#[test]
fn function_keys() {
    assert_eq!(encode_key("f1").unwrap(), b"\x1BOP".to_vec());
    assert_eq!(encode_key("f5").unwrap(), b"\x1B[15~".to_vec());
    assert_eq!(encode_key("f12").unwrap(), b"\x1B[24~".to_vec());
}

#[test]
fn ctrl_letter_and_space() {
    assert_eq!(encode_key("ctrl+a").unwrap(), vec![1]);
    assert_eq!(encode_key("ctrl+A").unwrap(), vec![1]);
    assert_eq!(encode_key("ctrl+space").unwrap(), vec![0]);
}

#[test]
fn alt_prefix_is_recursive() {
    assert_eq!(encode_key("alt+x").unwrap(), vec![0x1B, b'x']);
    assert_eq!(encode_key("alt+enter").unwrap(), vec![0x1B, 0x0D]);
}

#[test]
fn unicode_and_hex_codepoints() {
    assert_eq!(encode_key("u+0041").unwrap(), b"A".to_vec());
    assert_eq!(encode_key("0x41").unwrap(), vec![0x41]);
}

#[test]
fn case_and_separator_insensitivity() {
    assert_eq!(encode_key("CTRL+C").is_err(), encode_key("ctrl+c").is_err());
    assert_eq!(encode_key("shift-tab").unwrap(), encode_key("shift+tab").unwrap());
    assert_eq!(encode_key("shift tab").unwrap(), encode_key("shift+tab").unwrap());
}

#[test]
fn unknown_token_is_an_error() {
    let err = encode_key("definitely_not_a_key_ZZZ").unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::UnknownKeyToken);
}

#[test]
fn single_character_passthrough() {
    assert_eq!(encode_key("q").unwrap(), b"q".to_vec());
}

#[test]
fn plan_applies_default_delay_and_clears_last() {
    let items = parse_token_string("ctrl_u,backspace,enter");
    let plan = encode_plan(&items, DEFAULT_KEY_DELAY_MS).unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0].delay_ms_after, DEFAULT_KEY_DELAY_MS);
    assert_eq!(plan[1].delay_ms_after, DEFAULT_KEY_DELAY_MS);
    assert_eq!(plan[2].delay_ms_after, 0);
}

#[test]
fn token_string_text_prefix_is_literal() {
    let items = parse_token_string("text:hello,enter");
    let plan = encode_plan(&items, DEFAULT_KEY_DELAY_MS).unwrap();
    assert_eq!(plan[0].bytes, b"hello".to_vec());
    assert_eq!(plan[1].bytes, vec![0x0D]);
}

#[test]
fn key_sequence_round_trip_abc_enter() {
    let items = vec![
        KeyOrText::Text {
            value: "abc".to_string(),
            delay_ms_after: None,
        },
        KeyOrText::Key {
            value: "enter".to_string(),
            delay_ms_after: None,
        },
    ];
    let plan = encode_plan(&items, DEFAULT_KEY_DELAY_MS).unwrap();
    let stream: Vec<u8> = plan.iter().flat_map(|p| p.bytes.clone()).collect();
    assert_eq!(stream, b"abc\r".to_vec());
}
