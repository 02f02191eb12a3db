// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn http_status_matches_table() {
    assert_eq!(ErrorKind::NotFound.http_status(), 404);
    assert_eq!(ErrorKind::NameInvalid.http_status(), 400);
    assert_eq!(ErrorKind::Inactive.http_status(), 409);
    assert_eq!(ErrorKind::WriteFailed.http_status(), 502);
    assert_eq!(ErrorKind::ReadFailed.http_status(), 502);
    assert_eq!(ErrorKind::UnknownKeyToken.http_status(), 400);
    assert_eq!(ErrorKind::Blocked.http_status(), 422);
    assert_eq!(ErrorKind::ValidationError.http_status(), 400);
    assert_eq!(ErrorKind::InternalError.http_status(), 500);
}

#[test]
fn body_envelope_shape() {
    let err = BrokerError::blocked("write-host is disabled by the user");
    let body = err.body();
    assert_eq!(body["error"], "BLOCKED");
    assert_eq!(body["message"], "write-host is disabled by the user");
}

#[test]
fn display_includes_kind_and_message() {
    let err = BrokerError::not_found("no such session: foo");
    let rendered = err.to_string();
    assert!(rendered.contains("NOT_FOUND"));
    assert!(rendered.contains("no such session: foo"));
}
