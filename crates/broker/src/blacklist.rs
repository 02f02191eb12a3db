// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refuses to write inputs whose leading command token matches a
//! configured rule.

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub command: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    rules: Vec<Rule>,
    case_insensitive: bool,
}

impl Blacklist {
    pub fn new(rules: Vec<Rule>, case_insensitive: bool) -> Self {
        Self {
            rules,
            case_insensitive,
        }
    }

    /// Check `text` against every configured rule. Returns `Err` naming the
    /// first matched rule if any command token in `text` matches.
    pub fn check(&self, text: &str) -> Result<(), BrokerError> {
        for token in tokenize(text) {
            for rule in &self.rules {
                let matched = if self.case_insensitive {
                    token.eq_ignore_ascii_case(&rule.command)
                } else {
                    token == rule.command
                };
                if matched {
                    let message = rule
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("{} is disabled by the user", rule.command));
                    return Err(BrokerError::blocked(message));
                }
            }
        }
        Ok(())
    }
}

/// Split `text` by lines and by `;`/`|` within a line, drop a leading call
/// operator `&`, take the first whitespace-delimited token, and strip one
/// layer of surrounding quotes. Empty or control-only segments are skipped.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in text.lines() {
        for segment in line.split(|c| c == ';' || c == '|') {
            let trimmed = segment.trim_start();
            if trimmed.is_empty() || trimmed.chars().all(|c| c.is_control()) {
                continue;
            }
            let without_call_op = trimmed.strip_prefix('&').unwrap_or(trimmed).trim_start();
            let Some(first) = without_call_op.split_whitespace().next() else {
                continue;
            };
            let stripped = strip_quotes(first);
            if !stripped.is_empty() {
                tokens.push(stripped.to_string());
            }
        }
    }
    tokens
}

fn strip_quotes(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return &token[1..token.len() - 1];
        }
    }
    token
}

#[cfg(test)]
#[path = "blacklist_tests.rs"]
mod tests;
