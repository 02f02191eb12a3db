// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod http;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use crate::blacklist::Blacklist;
use crate::config::Config;
use crate::registry::Registry;

/// Shared state every axum handler borrows. Cheap to clone (all fields are
/// `Arc`s, plus a path); one instance lives for the process.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub blacklist: Arc<Blacklist>,
    pub config: Arc<Config>,
    /// Where `config` was loaded from; the settings endpoints read and
    /// splice this file directly rather than the in-memory snapshot.
    pub config_path: Arc<PathBuf>,
}
