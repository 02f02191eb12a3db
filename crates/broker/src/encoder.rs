// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps declarative key/text tokens to the exact byte sequences a PTY
//! expects, so callers never embed raw escape codes.

use crate::error::BrokerError;

pub const DEFAULT_KEY_DELAY_MS: u64 = 30;

/// One item in an encoded plan: bytes to write, plus the delay after
/// writing them (before the next item, if any).
#[derive(Debug, Clone)]
pub struct PlanItem {
    pub bytes: Vec<u8>,
    pub delay_ms_after: u64,
}

/// One input item as accepted from callers: either a key token or literal
/// text, with an optional per-item delay override.
#[derive(Debug, Clone)]
pub enum KeyOrText {
    Key { value: String, delay_ms_after: Option<u64> },
    Text { value: String, delay_ms_after: Option<u64> },
}

/// Parse a comma-separated token string, e.g. `"ctrl+u,backspace,enter"` or
/// `"text:hello,enter"`, into an ordered list of [`KeyOrText`] items.
pub fn parse_token_string(tokens: &str) -> Vec<KeyOrText> {
    tokens
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.strip_prefix("text:") {
            Some(rest) => KeyOrText::Text {
                value: rest.to_string(),
                delay_ms_after: None,
            },
            None => KeyOrText::Key {
                value: t.to_string(),
                delay_ms_after: None,
            },
        })
        .collect()
}

/// Encode an ordered list of key/text items into a byte/delay plan.
pub fn encode_plan(items: &[KeyOrText], default_delay_ms: u64) -> Result<Vec<PlanItem>, BrokerError> {
    let mut plan = Vec::with_capacity(items.len());
    for item in items {
        let (bytes, delay) = match item {
            KeyOrText::Text { value, delay_ms_after } => {
                (value.as_bytes().to_vec(), delay_ms_after.unwrap_or(default_delay_ms))
            }
            KeyOrText::Key { value, delay_ms_after } => {
                (encode_key(value)?, delay_ms_after.unwrap_or(default_delay_ms))
            }
        };
        plan.push(PlanItem {
            bytes,
            delay_ms_after: delay,
        });
    }
    // The last item carries no trailing delay.
    if let Some(last) = plan.last_mut() {
        last.delay_ms_after = 0;
    }
    Ok(plan)
}

/// Encode a single key token into its byte sequence.
pub fn encode_key(token: &str) -> Result<Vec<u8>, BrokerError> {
    let normalized = normalize_token(token);

    if let Some(rest) = normalized.strip_prefix("alt+") {
        let mut bytes = vec![0x1B];
        bytes.extend(encode_key(rest)?);
        return Ok(bytes);
    }

    if let Some(rest) = normalized.strip_prefix("ctrl+") {
        if rest == "space" {
            return Ok(vec![0x00]);
        }
        if rest.len() == 1 {
            if let Some(c) = rest.chars().next() {
                if c.is_ascii_alphabetic() {
                    let upper = c.to_ascii_uppercase() as u8;
                    return Ok(vec![upper - 0x40]);
                }
            }
        }
        return Err(BrokerError::unknown_key_token(format!(
            "unknown key token: {token}"
        )));
    }

    if let Some(code) = normalized.strip_prefix("u+") {
        if let Ok(cp) = u32::from_str_radix(code, 16) {
            if let Some(c) = char::from_u32(cp) {
                return Ok(c.to_string().into_bytes());
            }
        }
        return Err(BrokerError::unknown_key_token(format!(
            "unknown key token: {token}"
        )));
    }

    if let Some(code) = normalized.strip_prefix("0x") {
        if let Ok(byte) = u8::from_str_radix(code, 16) {
            return Ok(vec![byte]);
        }
        return Err(BrokerError::unknown_key_token(format!(
            "unknown key token: {token}"
        )));
    }

    let bytes: Option<&[u8]> = match normalized.as_str() {
        "ctrl_c" => Some(&[0x03]),
        "ctrl_z" => Some(&[0x1A]),
        "ctrl_d" => Some(&[0x04]),
        "esc" => Some(&[0x1B]),
        "enter" | "return" => Some(&[0x0D]),
        "double_esc" => Some(&[0x1B, 0x1B]),
        "tab" => Some(&[0x09]),
        "shift+tab" => Some(b"\x1B[Z"),
        "backspace" => Some(&[0x7F]),
        "delete" | "del" => Some(b"\x1B[3~"),
        "insert" | "ins" => Some(b"\x1B[2~"),
        "home" => Some(b"\x1B[H"),
        "end" => Some(b"\x1B[F"),
        "pageup" | "pgup" => Some(b"\x1B[5~"),
        "pagedown" | "pgdn" => Some(b"\x1B[6~"),
        "up" => Some(b"\x1B[A"),
        "down" => Some(b"\x1B[B"),
        "right" => Some(b"\x1B[C"),
        "left" => Some(b"\x1B[D"),
        "f1" => Some(b"\x1BOP"),
        "f2" => Some(b"\x1BOQ"),
        "f3" => Some(b"\x1BOR"),
        "f4" => Some(b"\x1BOS"),
        "f5" => Some(b"\x1B[15~"),
        "f6" => Some(b"\x1B[17~"),
        "f7" => Some(b"\x1B[18~"),
        "f8" => Some(b"\x1B[19~"),
        "f9" => Some(b"\x1B[20~"),
        "f10" => Some(b"\x1B[21~"),
        "f11" => Some(b"\x1B[23~"),
        "f12" => Some(b"\x1B[24~"),
        _ => None,
    };

    if let Some(bytes) = bytes {
        return Ok(bytes.to_vec());
    }

    // Single character passed through verbatim.
    let mut chars = normalized.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(c.to_string().into_bytes());
    }

    Err(BrokerError::unknown_key_token(format!(
        "unknown key token: {token}"
    )))
}

/// Case-insensitive; `_`, `-`, and spaces are all equivalent to `+`.
fn normalize_token(token: &str) -> String {
    token
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '+',
            other => other,
        })
        .collect::<String>()
        .split('+')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
#[path = "encoder_tests.rs"]
mod tests;
