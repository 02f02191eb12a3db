// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_spec_table() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 1106);
    assert_eq!(
        config.server.cors.origin,
        vec!["http://localhost:1107", "http://127.0.0.1:1107"]
    );
    assert!(config.server.cors.credentials);
    assert_eq!(config.terminal.max_buffer_size, 10_000);
    assert_eq!(config.terminal.session_timeout, 86_400_000);
    assert!(!config.terminal.enable_user_control);
    assert!(!config.mcp.enable_dns_rebinding_protection);
    assert!(config.mcp.command_blacklist.case_insensitive);
    assert!(config.mcp.command_blacklist.rules.is_empty());
}

#[test]
fn partial_yaml_only_overrides_named_leaves() {
    let raw: RawConfig = serde_yaml::from_str(
        r#"
server:
  port: 9000
mcp:
  command_blacklist:
    rules:
      - command: write-host
        message: blocked
"#,
    )
    .unwrap();
    let config = Config::merge(raw);

    assert_eq!(config.server.port, 9000);
    // Untouched leaf keeps its default.
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.mcp.command_blacklist.rules.len(), 1);
    assert_eq!(config.mcp.command_blacklist.rules[0].command, "write-host");
}

#[test]
fn missing_file_yields_pure_defaults() {
    let path = std::path::Path::new("/nonexistent/termbroker-does-not-exist.yaml");
    let config = Config::load(path).unwrap();
    assert_eq!(config.server.port, 1106);
}

#[test]
fn cli_port_override_wins() {
    let mut config = Config::default();
    let cli = Cli {
        config: std::path::PathBuf::from("termbroker.yaml"),
        port: Some(4242),
        log_format: "json".to_string(),
        log_level: "info".to_string(),
    };
    config.apply_cli_overrides(&cli);
    assert_eq!(config.server.port, 4242);
}
