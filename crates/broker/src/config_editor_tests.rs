use super::*;

const SAMPLE: &str = "\
app:
  name: termbroker # friendly name

server:
  host: 127.0.0.1
  port: 1106 # listen port
  cors:
    origin: [\"http://localhost:1107\"]
    credentials: true

terminal:
  max_buffer_size: 10000
";

#[test]
fn splice_scalar_replaces_value_and_keeps_trailing_comment() {
    let updated = splice_scalar(SAMPLE, &["server", "port"], "1107").expect("splice failed");
    assert!(
        updated.contains("port: 1107 # listen port"),
        "expected updated port line with comment preserved, got: {updated:?}"
    );
    assert!(updated.contains("host: 127.0.0.1"), "unrelated line should be untouched");
}

#[test]
fn splice_scalar_descends_nested_mappings() {
    let updated = splice_scalar(SAMPLE, &["server", "cors", "credentials"], "false")
        .expect("splice failed");
    assert!(updated.contains("credentials: false"));
    assert!(updated.contains("port: 1106 # listen port"), "sibling untouched");
}

#[test]
fn splice_scalar_errors_on_unknown_path() {
    let result = splice_scalar(SAMPLE, &["server", "does_not_exist"], "x");
    assert!(result.is_err(), "unknown path should not silently invent a key");
}

#[test]
fn apply_partial_update_merges_multiple_sections() {
    use crate::config::{RawConfig, RawServerConfig, RawTerminalConfig};

    let update = RawConfig {
        server: Some(RawServerConfig {
            host: None,
            port: Some(9999),
            cors: None,
        }),
        terminal: Some(RawTerminalConfig {
            default_shell: None,
            max_buffer_size: Some(20_000),
            session_timeout: None,
            enable_user_control: None,
        }),
        ..Default::default()
    };

    let updated = apply_partial_update(SAMPLE, &update).expect("update failed");
    assert!(updated.contains("port: 9999"));
    assert!(updated.contains("max_buffer_size: 20000"));
    assert!(updated.contains("name: termbroker # friendly name"), "untouched leaf preserved");
}
