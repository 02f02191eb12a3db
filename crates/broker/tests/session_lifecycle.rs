// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use termbroker::event::PtySignal;
use termbroker::registry::Registry;
use termbroker::session::CreateOptions;

fn options(name: &str, command: &str) -> CreateOptions {
    CreateOptions {
        name: name.to_string(),
        shell: Some(command.to_string()),
        cwd: None,
        env: vec![],
        cols: 80,
        rows: 24,
    }
}

#[tokio::test]
async fn spawn_runs_command_and_buffers_output() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);
    let session = registry
        .create(options("shell-test", "/bin/sh"))
        .expect("create failed");

    session
        .write(b"echo hello-from-shell", Some(true))
        .await
        .expect("write failed");

    tokio::time::sleep(Duration::from_millis(300)).await;

    let result = session.read(0, 100);
    let text = result
        .entries
        .iter()
        .map(|e| e.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(
        text.contains("hello-from-shell"),
        "expected echoed output, got: {text:?}"
    );
}

#[tokio::test]
async fn write_then_read_round_trips_through_cat() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);
    let session = registry
        .create(options("cat-test", "/bin/cat"))
        .expect("create failed");

    session
        .write(b"ping", Some(true))
        .await
        .expect("write failed");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = session.read(0, 100);
    let text = result
        .entries
        .iter()
        .map(|e| e.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(text.contains("ping"), "expected echoed input, got: {text:?}");
}

#[tokio::test]
async fn kill_marks_session_terminated() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);
    let session = registry
        .create(options("kill-test", "/bin/cat"))
        .expect("create failed");

    registry.kill("kill-test", PtySignal::Kill).expect("kill failed");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(session.status(), termbroker::session::Status::Terminated);
}

#[tokio::test]
async fn registry_rejects_duplicate_and_id_shaped_names() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);
    registry
        .create(options("worker-one", "/bin/cat"))
        .expect("first create should succeed");

    assert!(registry.create(options("worker-one", "/bin/cat")).is_err());
    assert!(registry
        .create(options("1a2b3c4d-worker", "/bin/cat"))
        .is_err());
}
