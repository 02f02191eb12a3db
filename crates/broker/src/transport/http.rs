// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST surface (§6): a thin adapter over the registry, session, interact,
//! and config components.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::BrokerError;
use crate::event::PtySignal;
use crate::interact::{self, InteractRequest};
use crate::session::CreateOptions;

use super::AppState;

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = build_cors(&state.config);

    Router::new()
        .route("/health", get(health))
        .route("/api/terminals", get(list_terminals).post(create_terminal))
        .route("/api/terminals/kill-all", post(kill_all))
        .route("/api/terminals/{id}", get(get_terminal).delete(delete_terminal))
        .route("/api/terminals/{id}/input", post(write_input))
        .route("/api/terminals/{id}/output", get(read_output))
        .route("/api/terminals/{id}/stats", get(terminal_stats))
        .route("/api/terminals/{id}/resize", put(resize_terminal))
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/settings/reset", post(reset_settings))
        .route("/api/settings/reload", get(reload_settings))
        .route("/api/version", get(version))
        .route("/ws", get(super::ws::upgrade))
        .layer(cors)
        .with_state(state)
}

fn build_cors(config: &crate::config::Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors
        .origin
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let mut layer = CorsLayer::new().allow_origin(AllowOrigin::list(origins));
    if config.server.cors.credentials {
        layer = layer.allow_credentials(true);
    }
    layer
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<Utc>,
    stats: crate::registry::RegistryStats,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        stats: state.registry.stats(),
    })
}

async fn list_terminals(State(state): State<AppState>) -> Json<Vec<crate::registry::SessionSummary>> {
    Json(interact::list_terminals(&state.registry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTerminalBody {
    terminal_name: String,
    shell: Option<String>,
    cwd: Option<String>,
    #[serde(default)]
    env: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTerminalResponse {
    terminal_id: String,
    pid: Option<u32>,
    shell: String,
    cwd: Option<String>,
    status: crate::session::Status,
}

async fn create_terminal(
    State(state): State<AppState>,
    Json(body): Json<CreateTerminalBody>,
) -> Result<(StatusCode, Json<CreateTerminalResponse>), BrokerError> {
    if body.terminal_name.trim().is_empty() {
        return Err(BrokerError::name_invalid("terminalName is required"));
    }
    let session = state
        .registry
        .create(CreateOptions {
            name: body.terminal_name,
            shell: body.shell,
            cwd: body.cwd,
            env: body.env,
            cols: 120,
            rows: 32,
        })
        .map_err(|e| BrokerError::internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTerminalResponse {
            terminal_id: session.name.clone(),
            pid: session.child_pid(),
            shell: session.shell.clone(),
            cwd: session.cwd.clone(),
            status: session.status(),
        }),
    ))
}

async fn get_terminal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::registry::SessionSummary>, BrokerError> {
    let session = state.registry.resolve(&id)?;
    let (cols, rows) = session.dimensions();
    Ok(Json(crate::registry::SessionSummary {
        name: session.name.clone(),
        shell: session.shell.clone(),
        status: session.status(),
        cols,
        rows,
        has_prompt: session.has_prompt(),
        alternate_screen: session.alternate_screen(),
        created_at: session.created_at,
        last_activity: session.last_activity(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteInputBody {
    input: String,
    append_newline: Option<bool>,
}

#[derive(Debug, Serialize)]
struct WriteInputResponse {
    bytes_written: usize,
    appended_newline: bool,
}

async fn write_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<WriteInputBody>,
) -> Result<Json<WriteInputResponse>, BrokerError> {
    if !state.config.terminal.enable_user_control {
        return Err(BrokerError::inactive(
            "terminal.enable_user_control is disabled",
        ));
    }
    state.blacklist.check(&body.input)?;
    let session = state.registry.resolve(&id)?;
    let outcome = session.write(body.input.as_bytes(), body.append_newline).await?;
    Ok(Json(WriteInputResponse {
        bytes_written: outcome.bytes_written,
        appended_newline: outcome.appended_newline,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputQuery {
    #[serde(default)]
    since: u64,
    #[serde(default = "default_max_lines")]
    max_lines: usize,
    mode: Option<String>,
}

fn default_max_lines() -> usize {
    500
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputResponse {
    output: String,
    total_lines: u64,
    has_more: bool,
    cursor: u64,
    truncated: bool,
}

async fn read_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OutputQuery>,
) -> Result<Json<OutputResponse>, BrokerError> {
    let session = state.registry.resolve(&id)?;
    let result = session.read(query.since, query.max_lines);
    let _ = query.mode;
    Ok(Json(OutputResponse {
        output: result
            .entries
            .iter()
            .map(|e| e.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        total_lines: result.total_lines,
        has_more: result.has_more,
        cursor: result.next_cursor,
        truncated: result.truncated,
    }))
}

async fn terminal_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::ring::BufferStats>, BrokerError> {
    let session = state.registry.resolve(&id)?;
    Ok(Json(session.buffer_stats()))
}

#[derive(Debug, Deserialize)]
struct ResizeBody {
    cols: u16,
    rows: u16,
}

async fn resize_terminal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResizeBody>,
) -> Result<StatusCode, BrokerError> {
    let session = state.registry.resolve(&id)?;
    session.resize(body.cols, body.rows).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct DeleteQuery {
    signal: Option<String>,
}

async fn delete_terminal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, BrokerError> {
    interact::kill_terminal(&state.registry, &id, query.signal.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct KillAllResponse {
    success: bool,
    total: usize,
    killed: usize,
    failed: Vec<KillFailure>,
}

#[derive(Debug, Serialize)]
struct KillFailure {
    id: String,
    message: String,
}

async fn kill_all(State(state): State<AppState>) -> Json<KillAllResponse> {
    let sessions = state.registry.list();
    let total = sessions.len();
    let mut killed = 0;
    let mut failed = Vec::new();
    for summary in sessions {
        match state.registry.kill(&summary.name, PtySignal::Term) {
            Ok(()) => killed += 1,
            Err(e) => failed.push(KillFailure {
                id: summary.name,
                message: e.message,
            }),
        }
    }
    Json(KillAllResponse {
        success: failed.is_empty(),
        total,
        killed,
        failed,
    })
}

async fn get_settings(State(state): State<AppState>) -> Json<crate::config::Config> {
    Json((*state.config).clone())
}

/// Applies a partial update to the on-disk YAML config via the
/// comment-preserving splice editor (§4.I), then returns the freshly
/// merged view. The running process keeps the values it started with;
/// the new ones take effect on the next restart.
async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<crate::config::RawConfig>,
) -> Result<Json<crate::config::Config>, BrokerError> {
    let existing = std::fs::read_to_string(state.config_path.as_path())
        .map_err(|e| BrokerError::internal(format!("failed to read config file: {e}")))?;
    let spliced = crate::config_editor::apply_partial_update(&existing, &update)?;
    std::fs::write(state.config_path.as_path(), &spliced)
        .map_err(|e| BrokerError::internal(format!("failed to write config file: {e}")))?;
    let merged = crate::config::Config::load(state.config_path.as_path())
        .map_err(|e| BrokerError::internal(format!("failed to reload written config: {e}")))?;
    Ok(Json(merged))
}

/// Overwrites the config file with hand-written defaults. Unlike
/// `update_settings` this re-serializes the whole document, so comments
/// are not preserved; a reset is a deliberate return to a clean slate.
async fn reset_settings(State(state): State<AppState>) -> Result<Json<crate::config::Config>, BrokerError> {
    let defaults = crate::config::Config::default();
    let rendered = serde_yaml::to_string(&defaults)
        .map_err(|e| BrokerError::internal(format!("failed to render default config: {e}")))?;
    std::fs::write(state.config_path.as_path(), rendered)
        .map_err(|e| BrokerError::internal(format!("failed to write config file: {e}")))?;
    Ok(Json(defaults))
}

async fn reload_settings(State(state): State<AppState>) -> Result<Json<crate::config::Config>, BrokerError> {
    let reloaded = crate::config::Config::load(state.config_path.as_path())
        .map_err(|e| BrokerError::internal(format!("failed to reload config: {e}")))?;
    Ok(Json(reloaded))
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    current_version: &'static str,
    latest_version: Option<String>,
    update_available: bool,
    last_checked_at: chrono::DateTime<Utc>,
    error: Option<String>,
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        current_version: env!("CARGO_PKG_VERSION"),
        latest_version: None,
        update_available: false,
        last_checked_at: Utc::now(),
        error: None,
    })
}

/// HTTP adapter over [`interact::interact`], shared with the MCP tool.
pub async fn interact_via_http(
    state: &AppState,
    req: InteractRequest,
) -> Result<crate::interact::InteractResult, BrokerError> {
    interact::interact(&state.registry, &state.blacklist, req).await
}
