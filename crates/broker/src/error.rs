// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error kinds shared across HTTP, WebSocket, and MCP transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    NameInvalid,
    Inactive,
    WriteFailed,
    ReadFailed,
    UnknownKeyToken,
    Blocked,
    ValidationError,
    InternalError,
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::NameInvalid => 400,
            Self::Inactive => 409,
            Self::WriteFailed => 502,
            Self::ReadFailed => 502,
            Self::UnknownKeyToken => 400,
            Self::Blocked => 422,
            Self::ValidationError => 400,
            Self::InternalError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::NameInvalid => "NAME_INVALID",
            Self::Inactive => "INACTIVE",
            Self::WriteFailed => "WRITE_FAILED",
            Self::ReadFailed => "READ_FAILED",
            Self::UnknownKeyToken => "UNKNOWN_KEY_TOKEN",
            Self::Blocked => "BLOCKED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured broker error: the matched [`ErrorKind`] plus a
/// human-readable message. Serializes to the `{error, message}` envelope
/// shared by the REST surface and the MCP tool responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BrokerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn name_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameInvalid, message)
    }

    pub fn inactive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inactive, message)
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WriteFailed, message)
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadFailed, message)
    }

    pub fn unknown_key_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownKeyToken, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Blocked, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// Build the `{error, message}` body used by the REST surface.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind.as_str(),
            "message": self.message,
        })
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BrokerError {}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
