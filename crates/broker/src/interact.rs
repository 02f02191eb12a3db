// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single `interact` operation: write, wait, read, normalize, and
//! assemble the structured result shared by the MCP tool and the HTTP
//! surface. `list`/`kill`/plain `read` are trivial pass-throughs on
//! [`crate::registry::Registry`] and [`crate::session::Session`] and live
//! at their respective transport layers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::blacklist::Blacklist;
use crate::encoder::{self, KeyOrText, PlanItem, DEFAULT_KEY_DELAY_MS};
use crate::error::{BrokerError, Result};
use crate::event::PtySignal;
use crate::registry::{Registry, SessionSummary};
use crate::ring::SmartMode;
use crate::session::{CreateOptions, Session};

const POLL_INTERVAL: Duration = Duration::from_millis(150);
const POST_WRITE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_IDLE_MS: u64 = 900;
const RESPONSE_TRUNCATE_AT: usize = 128_000;
const RAW_TAIL_VIEW_CHARS: usize = 8_000;
const TRUNCATE_HEAD_RATIO: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    #[default]
    None,
    Idle,
    Prompt,
    Pattern,
    Exit,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WaitOptions {
    #[serde(default)]
    pub mode: WaitMode,
    #[serde(default)]
    pub timeout_ms: u64,
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    pub pattern: Option<String>,
    #[serde(default)]
    pub pattern_regex: bool,
    #[serde(default)]
    pub pattern_case_sensitive: bool,
    #[serde(default = "default_true")]
    pub include_intermediate_output: bool,
}

fn default_idle_ms() -> u64 {
    DEFAULT_IDLE_MS
}

fn default_true() -> bool {
    true
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            mode: WaitMode::None,
            timeout_ms: 0,
            idle_ms: DEFAULT_IDLE_MS,
            pattern: None,
            pattern_regex: false,
            pattern_case_sensitive: false,
            include_intermediate_output: true,
        }
    }
}

/// Input to [`interact`]. Mirrors the MCP tool's schema exactly (§4.G).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InteractRequest {
    pub terminal_name: String,
    pub shell: Option<String>,
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
    pub input: Option<String>,
    #[serde(default)]
    pub append_newline: Option<bool>,
    pub special_operation: Option<String>,
    pub keys: Option<String>,
    pub key_sequence: Option<Vec<KeyOrTextInput>>,
    #[serde(default)]
    pub since: u64,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default)]
    pub mode: ReadMode,
    #[serde(default)]
    pub head_lines: usize,
    #[serde(default)]
    pub tail_lines: usize,
    #[serde(default)]
    pub strip_spinner: bool,
    #[serde(default)]
    pub wait: WaitOptions,
}

fn default_max_lines() -> usize {
    500
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    #[default]
    Auto,
    Head,
    Tail,
    HeadTail,
    Raw,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct KeyOrTextInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub delay_ms_after: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub appended_newline: bool,
    pub bytes_written: usize,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitResult {
    pub mode: String,
    pub timeout_ms: u64,
    pub met: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResultSummary {
    pub mode: String,
    pub since: u64,
    pub cursor: u64,
    pub has_more: bool,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeltaResult {
    pub text: String,
    pub bytes: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub is_running: bool,
    pub has_prompt: bool,
    pub pending_command: Option<String>,
    pub last_command: Option<String>,
    pub prompt_line: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub alternate_screen: bool,
    pub awaiting_input: bool,
    pub recommended_wait_mode: String,
    pub recommendation_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractResult {
    pub terminal_id: String,
    pub terminal_created: bool,
    pub write: Option<WriteResult>,
    pub wait: WaitResult,
    pub read: ReadResultSummary,
    pub delta: DeltaResult,
    pub command_output: String,
    pub status: StatusResult,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

/// `list_terminals` mode: return every session's summary.
pub fn list_terminals(registry: &Registry) -> Vec<SessionSummary> {
    registry.list()
}

/// `kill_terminal` mode: terminate the named session (signal defaults to
/// `SIGTERM`).
pub fn kill_terminal(registry: &Registry, name: &str, signal: Option<&str>) -> Result<()> {
    let signal = signal
        .and_then(PtySignal::from_name)
        .unwrap_or(PtySignal::Term);
    registry.kill(name, signal)
}

/// The main `interact` path (§4.F).
pub async fn interact(
    registry: &Registry,
    blacklist: &Blacklist,
    req: InteractRequest,
) -> Result<InteractResult> {
    let mut warnings = Vec::new();
    let (session, terminal_created) = match registry.resolve(&req.terminal_name) {
        Ok(session) => (session, false),
        Err(_) => {
            let created = registry
                .create(CreateOptions {
                    name: req.terminal_name.clone(),
                    shell: req.shell.clone(),
                    cwd: req.cwd.clone(),
                    env: req.env.clone(),
                    cols: 120,
                    rows: 32,
                })
                .map_err(|e| BrokerError::internal(e.to_string()))?;
            (created, true)
        }
    };

    let plan = build_plan(&session, &req, &mut warnings)?;
    for item in &plan {
        blacklist.check(&String::from_utf8_lossy(&item.bytes))?;
    }

    let baseline_cursor = session.latest_sequence();

    let write_result = write_plan(&session, &plan, &req).await?;

    tokio::time::sleep(POST_WRITE_DELAY).await;

    let (wait_result, accumulated_delta) = run_wait_loop(&session, baseline_cursor, &req.wait).await?;

    let (command_output, read_summary) = final_read(
        &session,
        baseline_cursor,
        req.mode,
        req.max_lines,
        req.head_lines,
        req.tail_lines,
        req.strip_spinner,
    );

    let (command_output, truncated_flag) = truncate_response(command_output);

    let status = build_status(&session);

    Ok(InteractResult {
        terminal_id: session.name.clone(),
        terminal_created,
        write: write_result,
        wait: wait_result,
        read: read_summary,
        delta: DeltaResult {
            bytes: accumulated_delta.len(),
            lines: accumulated_delta.lines().count(),
            text: accumulated_delta,
        },
        command_output,
        status,
        truncated: truncated_flag,
        warnings,
    })
}

/// Pre-write checks (§4.F): special_operation > keys/key_sequence > plain
/// input, with the interactive-state auto-conversion to a key sequence.
fn build_plan(
    session: &Session,
    req: &InteractRequest,
    warnings: &mut Vec<String>,
) -> Result<Vec<PlanItem>> {
    if let Some(op) = &req.special_operation {
        let items = vec![KeyOrText::Key {
            value: op.clone(),
            delay_ms_after: None,
        }];
        return encoder::encode_plan(&items, DEFAULT_KEY_DELAY_MS);
    }

    if let Some(seq) = &req.key_sequence {
        let items: Vec<KeyOrText> = seq
            .iter()
            .map(|item| {
                if item.kind == "text" {
                    KeyOrText::Text {
                        value: item.value.clone(),
                        delay_ms_after: item.delay_ms_after,
                    }
                } else {
                    KeyOrText::Key {
                        value: item.value.clone(),
                        delay_ms_after: item.delay_ms_after,
                    }
                }
            })
            .collect();
        return encoder::encode_plan(&items, DEFAULT_KEY_DELAY_MS);
    }

    if let Some(keys) = &req.keys {
        let items = encoder::parse_token_string(keys);
        return encoder::encode_plan(&items, DEFAULT_KEY_DELAY_MS);
    }

    let Some(input) = &req.input else {
        return Ok(Vec::new());
    };

    let append_newline = req.append_newline.unwrap_or(true);
    let is_interactive =
        session.alternate_screen() || session.pending_command().is_some() || session.awaiting_input();

    if append_newline && is_interactive {
        warnings.push(
            "terminal is interactive — inspect output and respond accordingly".to_string(),
        );
        let items = vec![
            KeyOrText::Text {
                value: input.trim_end().to_string(),
                delay_ms_after: None,
            },
            KeyOrText::Key {
                value: "enter".to_string(),
                delay_ms_after: None,
            },
        ];
        return encoder::encode_plan(&items, DEFAULT_KEY_DELAY_MS);
    }

    Ok(vec![PlanItem {
        bytes: input.as_bytes().to_vec(),
        delay_ms_after: 0,
    }])
}

async fn write_plan(
    session: &Session,
    plan: &[PlanItem],
    req: &InteractRequest,
) -> Result<Option<WriteResult>> {
    if plan.is_empty() {
        return Ok(None);
    }

    let started_at = Utc::now();
    let mut bytes_written = 0;
    let mut appended_newline = false;

    let is_plain_text_only = req.special_operation.is_none()
        && req.keys.is_none()
        && req.key_sequence.is_none()
        && req.input.is_some();

    for (idx, item) in plan.iter().enumerate() {
        let append_newline = if is_plain_text_only && plan.len() == 1 {
            req.append_newline
        } else {
            Some(false)
        };
        let outcome = session.write(&item.bytes, append_newline).await?;
        bytes_written += outcome.bytes_written;
        appended_newline = outcome.appended_newline;
        if idx + 1 < plan.len() && item.delay_ms_after > 0 {
            tokio::time::sleep(Duration::from_millis(item.delay_ms_after)).await;
        }
    }

    Ok(Some(WriteResult {
        appended_newline,
        bytes_written,
        started_at,
    }))
}

async fn run_wait_loop(
    session: &Session,
    baseline_cursor: u64,
    wait: &WaitOptions,
) -> Result<(WaitResult, String)> {
    let mode_name = match wait.mode {
        WaitMode::None => "none",
        WaitMode::Idle => "idle",
        WaitMode::Prompt => "prompt",
        WaitMode::Pattern => "pattern",
        WaitMode::Exit => "exit",
    };

    if wait.mode == WaitMode::None || wait.timeout_ms == 0 {
        return Ok((
            WaitResult {
                mode: mode_name.to_string(),
                timeout_ms: wait.timeout_ms,
                met: true,
                reason: "none".to_string(),
            },
            String::new(),
        ));
    }

    let pattern = match (&wait.pattern, wait.mode) {
        (Some(p), WaitMode::Pattern) => Some(compile_pattern(p, wait.pattern_regex, wait.pattern_case_sensitive)?),
        _ => None,
    };

    let deadline = Instant::now() + Duration::from_millis(wait.timeout_ms);
    let mut next_since = baseline_cursor;
    let mut accumulated = String::new();
    let mut last_change_at = Instant::now();
    let mut last_raw_tail = session.raw_tail();
    let mut seen_any_delta = false;

    let (reason, met) = loop {
        let result = session.read(next_since, 10_000);
        if !result.entries.is_empty() {
            next_since = result.next_cursor;
            let mut text = result
                .entries
                .iter()
                .map(|e| e.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            text = normalize_delta(&text, false);
            if !text.is_empty() {
                seen_any_delta = true;
                last_change_at = Instant::now();
                if wait.include_intermediate_output {
                    if !accumulated.is_empty() {
                        accumulated.push('\n');
                    }
                    accumulated.push_str(&text);
                } else {
                    accumulated = text;
                }
            }
        }

        let raw_tail = session.raw_tail();
        if raw_tail != last_raw_tail {
            last_raw_tail = raw_tail;
            last_change_at = Instant::now();
        }

        match wait.mode {
            WaitMode::Idle => {
                if seen_any_delta && last_change_at.elapsed() >= Duration::from_millis(wait.idle_ms) {
                    break ("idle", true);
                }
            }
            WaitMode::Prompt => {
                if session.has_prompt() || session.awaiting_input() {
                    break ("prompt", true);
                }
            }
            WaitMode::Pattern => {
                if let Some(re) = &pattern {
                    if re.is_match(&accumulated) {
                        break ("pattern", true);
                    }
                }
            }
            WaitMode::Exit => {
                if session.status() != crate::session::Status::Active && seen_any_delta {
                    break ("exit", true);
                }
            }
            WaitMode::None => unreachable!("handled above"),
        }

        if Instant::now() >= deadline {
            break ("timeout", false);
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    };

    Ok((
        WaitResult {
            mode: mode_name.to_string(),
            timeout_ms: wait.timeout_ms,
            met,
            reason: reason.to_string(),
        },
        accumulated,
    ))
}

fn compile_pattern(pattern: &str, is_regex: bool, case_sensitive: bool) -> Result<Regex> {
    let source = if is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    let source = if case_sensitive {
        source
    } else {
        format!("(?i){source}")
    };
    Regex::new(&source).map_err(|e| BrokerError::validation(format!("invalid pattern: {e}")))
}

fn final_read(
    session: &Session,
    baseline_cursor: u64,
    mode: ReadMode,
    max_lines: usize,
    head_lines: usize,
    tail_lines: usize,
    strip_spinner: bool,
) -> (String, ReadResultSummary) {
    if session.alternate_screen() || mode == ReadMode::Raw {
        let raw_tail = session.raw_tail();
        let view: String = raw_tail
            .chars()
            .rev()
            .take(RAW_TAIL_VIEW_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let text = normalize_delta(&view, strip_spinner);
        return (
            text,
            ReadResultSummary {
                mode: "raw".to_string(),
                since: baseline_cursor,
                cursor: session.latest_sequence(),
                has_more: false,
                truncated: false,
            },
        );
    }

    if let Some(smart_mode) = smart_mode_for(mode) {
        let result = session.read_smart(baseline_cursor, smart_mode, max_lines, head_lines, tail_lines);
        let mut parts: Vec<&str> = result.head.iter().map(|e| e.content.as_str()).collect();
        if result.lines_omitted > 0 {
            let marker = format!("... {} lines omitted ...", result.lines_omitted);
            let text = normalize_delta(&parts.join("\n"), strip_spinner);
            let tail_text = normalize_delta(
                &result
                    .tail
                    .iter()
                    .map(|e| e.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                strip_spinner,
            );
            let joined = [text, marker, tail_text]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return (
                joined,
                ReadResultSummary {
                    mode: mode_name(mode).to_string(),
                    since: baseline_cursor,
                    cursor: session.latest_sequence(),
                    has_more: false,
                    truncated: result.truncated,
                },
            );
        }
        parts.extend(result.tail.iter().map(|e| e.content.as_str()));
        let text = normalize_delta(&parts.join("\n"), strip_spinner);
        return (
            text,
            ReadResultSummary {
                mode: mode_name(mode).to_string(),
                since: baseline_cursor,
                cursor: session.latest_sequence(),
                has_more: false,
                truncated: result.truncated,
            },
        );
    }

    // The command's full baseline->end output is never paged by
    // `max_lines` (that cap is for the plain `GET .../output` paging
    // endpoint only); the 128,000-char response truncation is what
    // bounds this read's size.
    let result = session.read(baseline_cursor, usize::MAX);
    let text = result
        .entries
        .iter()
        .map(|e| e.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = normalize_delta(&text, strip_spinner);
    (
        text,
        ReadResultSummary {
            mode: mode_name(mode).to_string(),
            since: baseline_cursor,
            cursor: result.next_cursor,
            has_more: result.has_more,
            truncated: result.truncated,
        },
    )
}

fn smart_mode_for(mode: ReadMode) -> Option<SmartMode> {
    match mode {
        ReadMode::Head => Some(SmartMode::Head),
        ReadMode::Tail => Some(SmartMode::Tail),
        ReadMode::HeadTail => Some(SmartMode::HeadTail),
        ReadMode::Auto | ReadMode::Raw => None,
    }
}

fn mode_name(mode: ReadMode) -> &'static str {
    match mode {
        ReadMode::Auto => "auto",
        ReadMode::Head => "head",
        ReadMode::Tail => "tail",
        ReadMode::HeadTail => "head_tail",
        ReadMode::Raw => "raw",
    }
}

/// Strip spinner frames (if requested), collapse runs of >=4 blank lines
/// to 3, drop exact consecutive duplicates, and collapse a repeated
/// command echo (keep the first occurrence).
fn normalize_delta(text: &str, strip_spinner: bool) -> String {
    let spinner_chars: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏', '|', '/', '-', '\\'];

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;
    let mut prev: Option<String> = None;

    for raw_line in text.lines() {
        let line = if strip_spinner && raw_line.trim().chars().count() == 1 {
            let c = raw_line.trim().chars().next();
            if c.map(|c| spinner_chars.contains(&c)).unwrap_or(false) {
                continue;
            } else {
                raw_line.to_string()
            }
        } else {
            raw_line.to_string()
        };

        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 3 {
                continue;
            }
        } else {
            blank_run = 0;
        }

        if prev.as_deref() == Some(line.as_str()) {
            continue;
        }
        prev = Some(line.clone());
        lines.push(line);
    }

    dedupe_command_echo(&mut lines);
    lines.join("\n")
}

/// If the first non-blank line repeats later (a shell often echoes the
/// just-submitted command), keep only its first occurrence.
fn dedupe_command_echo(lines: &mut Vec<String>) {
    let Some(first) = lines.iter().find(|l| !l.trim().is_empty()).cloned() else {
        return;
    };
    let mut seen_first = false;
    let mut keep = Vec::with_capacity(lines.len());
    for line in lines.drain(..) {
        if line == first {
            if seen_first {
                continue;
            }
            seen_first = true;
        }
        keep.push(line);
    }
    *lines = keep;
}

/// If `text` exceeds ~128 000 UTF-8 scalar units, keep 55% head + 45% tail
/// with a truncation marker in between.
fn truncate_response(text: String) -> (String, bool) {
    let total = text.chars().count();
    if total <= RESPONSE_TRUNCATE_AT {
        return (text, false);
    }

    let head_len = (RESPONSE_TRUNCATE_AT as f64 * TRUNCATE_HEAD_RATIO) as usize;
    let tail_len = RESPONSE_TRUNCATE_AT - head_len;
    let chars: Vec<char> = text.chars().collect();
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    let omitted = total - head_len - tail_len;

    let marker = format!(
        "\n--- Output Truncated (kept {head_len}+{tail_len} chars, omitted {omitted} chars) ---\n"
    );
    (format!("{head}{marker}{tail}"), true)
}

fn build_status(session: &Session) -> StatusResult {
    let status = session.status();
    let pending = session.pending_command().map(|p| p.text);
    let last = session.last_command().map(|c| c.text);
    let has_prompt = session.has_prompt();
    let awaiting_input = session.awaiting_input();
    let is_running = status == crate::session::Status::Active;

    let (recommended_wait_mode, recommendation_reason) = if !is_running {
        ("exit", "session has terminated")
    } else if session.alternate_screen() {
        ("idle", "alternate screen active; prefer idle or pattern waits")
    } else if has_prompt || awaiting_input {
        ("prompt", "shell is at a prompt or awaiting input")
    } else if pending.is_some() {
        ("idle", "a command is running; idle wait will catch completion")
    } else {
        ("idle", "no strong signal; idle wait is the safe default")
    };

    StatusResult {
        is_running,
        has_prompt,
        pending_command: pending,
        last_command: last,
        prompt_line: session.last_prompt_line(),
        last_activity: session.last_activity(),
        alternate_screen: session.alternate_screen(),
        awaiting_input,
        recommended_wait_mode: recommended_wait_mode.to_string(),
        recommendation_reason: recommendation_reason.to_string(),
    }
}

#[cfg(test)]
#[path = "interact_tests.rs"]
mod tests;
