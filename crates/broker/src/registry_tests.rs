// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rejects_id_shaped_names() {
    assert!(id_shaped_name("1a2b3c4d-5678-90ab"));
    assert!(!id_shaped_name("build-shell"));
}

#[tokio::test]
async fn create_rejects_duplicate_and_empty_names() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);

    let first = registry.create(CreateOptions {
        name: "alpha".to_string(),
        shell: Some("/bin/sh".to_string()),
        cwd: None,
        env: vec![],
        cols: 80,
        rows: 24,
    });
    assert!(first.is_ok());

    let dup = registry.create(CreateOptions {
        name: "alpha".to_string(),
        shell: Some("/bin/sh".to_string()),
        cwd: None,
        env: vec![],
        cols: 80,
        rows: 24,
    });
    assert!(dup.is_err());

    let empty = registry.create(CreateOptions {
        name: "".to_string(),
        shell: Some("/bin/sh".to_string()),
        cwd: None,
        env: vec![],
        cols: 80,
        rows: 24,
    });
    assert!(empty.is_err());
}

#[tokio::test]
async fn resolve_unknown_name_is_not_found() {
    let registry = Registry::new(10_000, true, 80, 86_400_000);
    let err = registry.resolve("missing").unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
}
