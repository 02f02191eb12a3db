// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;

use termbroker::blacklist::Blacklist;
use termbroker::config::Config;
use termbroker::registry::Registry;
use termbroker::transport::{http, AppState};

fn test_server() -> TestServer {
    let mut config = Config::default();
    config.terminal.enable_user_control = true;
    let config = Arc::new(config);
    let registry = Registry::new(config.terminal.max_buffer_size, true, 80, config.terminal.session_timeout);
    let blacklist = Arc::new(Blacklist::new(
        config.mcp.command_blacklist.rules.clone(),
        config.mcp.command_blacklist.case_insensitive,
    ));
    let state = AppState {
        registry,
        blacklist,
        config,
        config_path: Arc::new(std::path::PathBuf::from("termbroker.yaml")),
    };
    TestServer::new(http::router(state)).expect("failed to build test server")
}

#[tokio::test]
async fn health_reports_stats() {
    let server = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stats"]["total_sessions"], 0);
}

#[tokio::test]
async fn create_then_list_then_delete_terminal() {
    let server = test_server();

    let create = server
        .post("/api/terminals")
        .json(&json!({ "terminalName": "api-test", "shell": "/bin/cat" }))
        .await;
    create.assert_status(axum::http::StatusCode::CREATED);

    let list = server.get("/api/terminals").await;
    list.assert_status_ok();
    let sessions: Vec<serde_json::Value> = list.json();
    assert!(sessions.iter().any(|s| s["name"] == "api-test"));

    let delete = server.delete("/api/terminals/api-test").await;
    delete.assert_status(axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn create_rejects_empty_name() {
    let server = test_server();
    let response = server
        .post("/api/terminals")
        .json(&json!({ "terminalName": "" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn output_for_unknown_terminal_is_not_found() {
    let server = test_server();
    let response = server.get("/api/terminals/does-not-exist/output").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

fn test_server_with_config_file(config_path: std::path::PathBuf) -> TestServer {
    let config = Arc::new(Config::default());
    let registry = Registry::new(config.terminal.max_buffer_size, true, 80, config.terminal.session_timeout);
    let blacklist = Arc::new(Blacklist::new(
        config.mcp.command_blacklist.rules.clone(),
        config.mcp.command_blacklist.case_insensitive,
    ));
    let state = AppState {
        registry,
        blacklist,
        config,
        config_path: Arc::new(config_path),
    };
    TestServer::new(http::router(state)).expect("failed to build test server")
}

#[tokio::test]
async fn update_settings_splices_value_into_existing_yaml_file() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let config_path = dir.path().join("termbroker.yaml");
    std::fs::write(
        &config_path,
        "server:\n  host: 127.0.0.1\n  port: 1106 # listen port\n",
    )
    .expect("write seed config failed");

    let server = test_server_with_config_file(config_path.clone());
    let response = server
        .post("/api/settings")
        .json(&json!({ "server": { "port": 9999 } }))
        .await;
    response.assert_status_ok();

    let on_disk = std::fs::read_to_string(&config_path).expect("read config failed");
    assert!(
        on_disk.contains("port: 9999 # listen port"),
        "expected spliced value with comment preserved, got: {on_disk:?}"
    );
    assert!(on_disk.contains("host: 127.0.0.1"), "untouched sibling key");
}

#[tokio::test]
async fn reset_settings_overwrites_file_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let config_path = dir.path().join("termbroker.yaml");
    std::fs::write(&config_path, "server:\n  port: 9999\n").expect("write seed config failed");

    let server = test_server_with_config_file(config_path.clone());
    let response = server.post("/api/settings/reset").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["server"]["port"], 1106);
}
