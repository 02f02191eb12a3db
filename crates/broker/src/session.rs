// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single PTY-backed session: one child process, one output buffer, and
//! the prompt/command/alt-screen bookkeeping layered on top of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::error::{BrokerError, Result};
use crate::event::SessionEvent;
use crate::pty::spawn::NativePty;
use crate::pty::{Backend, ExitStatus};
use crate::ring::{BufferStats, OutputBuffer, ReadResult, SmartMode, SmartReadResult};

/// Upper bound on `raw_tail`, in UTF-8 scalar values (not bytes).
pub const RAW_TAIL_MAX: usize = 200_000;
const WRITE_CHUNK_SIZE: usize = 4_000;
const WRITE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const AWAITING_INPUT_WINDOW: usize = 200;
const ALT_SCREEN_TAIL: usize = 16;

/// Lifecycle status of a [`Session`]. `Inactive` is reserved for explicit
/// freezing and is never entered by the default reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
    Terminated,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingCommand {
    pub text: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastCommand {
    pub text: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Inputs to [`Session::spawn`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub name: String,
    pub shell: Option<String>,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
}

/// Outcome of [`Session::write`].
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub bytes_written: usize,
    pub appended_newline: bool,
}

struct Mutable {
    status: Status,
    last_activity: DateTime<Utc>,
    pending_command: Option<PendingCommand>,
    last_command: Option<LastCommand>,
    last_prompt_line: Option<String>,
    has_prompt: bool,
    alternate_screen: bool,
    alt_scan_tail: Vec<u8>,
    raw_tail: String,
    cols: u16,
    rows: u16,
}

/// One child process driven over a PTY, plus its output buffer and the
/// prompt/command tracking state layered on top.
pub struct Session {
    pub name: String,
    pub shell: String,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub created_at: DateTime<Utc>,
    child_pid: Option<u32>,
    buffer: Mutex<OutputBuffer>,
    state: Mutex<Mutable>,
    input_tx: mpsc::Sender<Bytes>,
    resize_tx: mpsc::Sender<(u16, u16)>,
    event_tx: broadcast::Sender<SessionEvent>,
    exited: AtomicBool,
}

/// Resolve a shell alias to its spawn-ready command line. Platforms where
/// `pwsh` needs the `.exe` suffix are handled here, ahead of the fork.
fn resolve_shell(shell: &str) -> Vec<String> {
    let program = match shell {
        "pwsh" if cfg!(windows) => "pwsh.exe".to_string(),
        other => other.to_string(),
    };
    vec![program]
}

/// Merge caller-supplied env over the create-contract defaults. Later
/// entries (the caller's) win on duplicate keys.
fn merge_env_defaults(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged = vec![
        ("TERM".to_string(), "xterm-256color".to_string()),
        ("LANG".to_string(), "en_US.UTF-8".to_string()),
        ("PAGER".to_string(), "cat".to_string()),
    ];
    for (key, value) in overrides {
        if let Some(existing) = merged.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.clone();
        } else {
            merged.push((key.clone(), value.clone()));
        }
    }
    merged
}

impl Session {
    /// Spawn a new PTY-backed session per the create contract (§4.B).
    pub fn spawn(
        options: CreateOptions,
        buffer_capacity: usize,
        coalesce_spinners: bool,
        animation_throttle_ms: u64,
    ) -> anyhow::Result<Arc<Self>> {
        let shell = options.shell.unwrap_or_else(|| "/bin/sh".to_string());
        let command = resolve_shell(&shell);
        let env = merge_env_defaults(&options.env);

        let mut backend = NativePty::spawn(
            &command,
            options.cols,
            options.rows,
            options.cwd.as_deref(),
            &env,
        )?;
        let child_pid = backend.child_pid();

        let (output_tx, mut output_rx) = mpsc::channel::<Bytes>(256);
        let (input_tx, input_rx) = mpsc::channel::<Bytes>(64);
        let (resize_tx, resize_rx) = mpsc::channel::<(u16, u16)>(8);
        let (event_tx, _event_rx) = broadcast::channel(64);

        let now = Utc::now();
        let session = Arc::new(Self {
            name: options.name,
            shell,
            cwd: options.cwd,
            env,
            created_at: now,
            child_pid,
            buffer: Mutex::new(OutputBuffer::new(
                buffer_capacity,
                coalesce_spinners,
                animation_throttle_ms,
            )),
            state: Mutex::new(Mutable {
                status: Status::Active,
                last_activity: now,
                pending_command: None,
                last_command: None,
                last_prompt_line: None,
                has_prompt: false,
                alternate_screen: false,
                alt_scan_tail: Vec::new(),
                raw_tail: String::new(),
                cols: options.cols,
                rows: options.rows,
            }),
            input_tx,
            resize_tx,
            event_tx,
            exited: AtomicBool::new(false),
        });

        let _ = session.event_tx.send(SessionEvent::Created);

        {
            let session = session.clone();
            tokio::spawn(async move {
                let result = backend.run(output_tx, input_rx, resize_rx).await;
                session.on_exit(result);
            });
        }

        {
            let session = session.clone();
            tokio::spawn(async move {
                while let Some(chunk) = output_rx.recv().await {
                    session.ingest(&chunk);
                }
            });
        }

        Ok(session)
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn subscribe_data(&self) -> broadcast::Receiver<Vec<crate::ring::Entry>> {
        self.buffer.lock().subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.state.lock().last_activity
    }

    pub fn idle_for(&self) -> chrono::Duration {
        Utc::now() - self.last_activity()
    }

    /// Write `bytes` to the child process per the write contract (§4.B).
    /// `append_newline`, if `None`, is inferred: true for a single plain
    /// line, false for multi-line input or input carrying control bytes.
    pub async fn write(&self, bytes: &[u8], append_newline: Option<bool>) -> Result<WriteOutcome> {
        if self.status() != Status::Active {
            return Err(BrokerError::inactive(format!(
                "session '{}' is not active",
                self.name
            )));
        }

        let text = String::from_utf8_lossy(bytes);
        let has_control = bytes
            .iter()
            .any(|&b| b < 0x20 && b != b'\r' && b != b'\n' && b != b'\t');
        let is_multiline = text.contains('\n') || text.contains('\r');
        let append_newline = append_newline.unwrap_or(!has_control && !is_multiline);

        let mut payload = normalize_write_payload(bytes);
        if append_newline && !payload.ends_with(b"\r") {
            payload.push(b'\r');
        }

        let ends_with_enter = payload.ends_with(b"\r");
        if ends_with_enter {
            if let Some(command_text) = last_logical_line(&text) {
                if is_mostly_printable(&command_text) {
                    let mut state = self.state.lock();
                    state.pending_command = Some(PendingCommand {
                        text: command_text,
                        started_at: Utc::now(),
                    });
                    state.has_prompt = false;
                }
            }
        }

        let mut written = 0usize;
        for chunk in payload.chunks(WRITE_CHUNK_SIZE) {
            match tokio::time::timeout(WRITE_DRAIN_TIMEOUT, self.input_tx.send(Bytes::copy_from_slice(chunk)))
                .await
            {
                Ok(Ok(())) => {
                    written += chunk.len();
                    tokio::task::yield_now().await;
                }
                Ok(Err(_)) => {
                    return Err(BrokerError::write_failed(format!(
                        "session '{}' input channel closed",
                        self.name
                    )));
                }
                Err(_) => {
                    return Err(BrokerError::write_failed(format!(
                        "session '{}' did not drain input within {:?}",
                        self.name, WRITE_DRAIN_TIMEOUT
                    )));
                }
            }
        }

        self.state.lock().last_activity = Utc::now();
        Ok(WriteOutcome {
            bytes_written: written,
            appended_newline: append_newline,
        })
    }

    /// Forward a resize to the PTY and update session fields. Does not
    /// perturb the buffer.
    pub async fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        if self.status() != Status::Active {
            return Err(BrokerError::inactive(format!(
                "session '{}' is not active",
                self.name
            )));
        }
        {
            let mut state = self.state.lock();
            state.cols = cols;
            state.rows = rows;
        }
        let _ = self.resize_tx.send((cols, rows)).await;
        Ok(())
    }

    /// Send a signal to the child process and mark the session terminated.
    /// Announce that the registry is dropping its last reference to this
    /// session (reaper sweep or explicit delete). Does not itself close
    /// the PTY; that happens when the last `Arc<Session>` is dropped.
    pub fn mark_cleaned(&self) {
        let _ = self.event_tx.send(SessionEvent::Cleaned);
    }

    pub fn kill(&self, signal: crate::event::PtySignal) -> Result<()> {
        let Some(pid) = self.child_pid else {
            return Err(BrokerError::internal("session has no child pid"));
        };
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal.to_nix())
            .map_err(|e| BrokerError::internal(format!("kill failed: {e}")))?;
        self.state.lock().status = Status::Terminated;
        let _ = self.event_tx.send(SessionEvent::Killed);
        Ok(())
    }

    pub fn read(&self, since: u64, max_lines: usize) -> ReadResult {
        self.buffer.lock().read(since, max_lines)
    }

    pub fn read_smart(
        &self,
        since: u64,
        mode: SmartMode,
        max_lines: usize,
        head_lines: usize,
        tail_lines: usize,
    ) -> SmartReadResult {
        self.buffer
            .lock()
            .read_smart(since, mode, max_lines, head_lines, tail_lines)
    }

    pub fn get_latest(&self, n: usize) -> Vec<crate::ring::Entry> {
        self.buffer.lock().get_latest(n)
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.buffer.lock().get_stats()
    }

    pub fn latest_sequence(&self) -> u64 {
        self.buffer.lock().latest_sequence()
    }

    pub fn raw_tail(&self) -> String {
        self.state.lock().raw_tail.clone()
    }

    pub fn alternate_screen(&self) -> bool {
        self.state.lock().alternate_screen
    }

    pub fn has_prompt(&self) -> bool {
        self.state.lock().has_prompt
    }

    pub fn last_prompt_line(&self) -> Option<String> {
        self.state.lock().last_prompt_line.clone()
    }

    pub fn pending_command(&self) -> Option<PendingCommand> {
        self.state.lock().pending_command.clone()
    }

    pub fn last_command(&self) -> Option<LastCommand> {
        self.state.lock().last_command.clone()
    }

    pub fn dimensions(&self) -> (u16, u16) {
        let state = self.state.lock();
        (state.cols, state.rows)
    }

    /// Last 200 bytes of the raw tail not ending in newline, ending with
    /// `:`, `?`, `]` or `>>` (modulo trailing spaces).
    pub fn awaiting_input(&self) -> bool {
        let raw_tail = self.state.lock().raw_tail.clone();
        let window: String = raw_tail
            .chars()
            .rev()
            .take(AWAITING_INPUT_WINDOW)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if window.ends_with('\n') {
            return false;
        }
        let trimmed = window.trim_end_matches(' ');
        if trimmed.ends_with(">>") {
            return true;
        }
        matches!(trimmed.chars().last(), Some(':') | Some('?') | Some(']'))
    }

    fn ingest(&self, chunk: &[u8]) {
        {
            let mut state = self.state.lock();
            state.last_activity = Utc::now();

            state.raw_tail.push_str(&String::from_utf8_lossy(chunk));
            let overflow = state
                .raw_tail
                .chars()
                .count()
                .saturating_sub(RAW_TAIL_MAX);
            if overflow > 0 {
                let trimmed: String = state.raw_tail.chars().skip(overflow).collect();
                state.raw_tail = trimmed;
            }

            let mut scan_buf = std::mem::take(&mut state.alt_scan_tail);
            scan_buf.extend_from_slice(chunk);
            scan_alt_screen(&scan_buf, &mut state.alternate_screen);
            let keep_from = scan_buf.len().saturating_sub(ALT_SCREEN_TAIL);
            state.alt_scan_tail = scan_buf[keep_from..].to_vec();
        }

        let new_entries = self.buffer.lock().append(chunk);
        if new_entries.is_empty() {
            return;
        }

        let mut state = self.state.lock();
        for entry in &new_entries {
            if is_prompt_line(&entry.content) {
                if let Some(pending) = state.pending_command.take() {
                    state.last_command = Some(LastCommand {
                        text: pending.text,
                        started_at: pending.started_at,
                        completed_at: Utc::now(),
                    });
                }
                state.has_prompt = true;
                state.last_prompt_line = Some(entry.content.clone());
            }
        }
    }

    fn on_exit(&self, result: anyhow::Result<ExitStatus>) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        self.buffer.lock().flush_partial();
        match result {
            Ok(status) => debug!(session = %self.name, ?status.code, ?status.signal, "pty exited"),
            Err(e) => warn!(session = %self.name, error = %e, "pty run loop errored"),
        }
        let mut state = self.state.lock();
        if state.status != Status::Terminated {
            state.status = Status::Terminated;
            drop(state);
            let _ = self.event_tx.send(SessionEvent::Exit);
        }
    }
}

/// Normalize `\r\n` and bare `\n` in a write payload to `\r`, mimicking a
/// real TTY's Enter key.
fn normalize_write_payload(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                out.push(b'\r');
            }
            b'\r' => {
                out.push(b'\r');
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn last_logical_line(text: &str) -> Option<String> {
    text.split(['\r', '\n'])
        .filter(|l| !l.trim().is_empty())
        .next_back()
        .map(|l| l.trim().to_string())
}

fn is_mostly_printable(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let printable = text.chars().filter(|c| !c.is_control()).count();
    (printable as f64 / text.chars().count() as f64) >= 0.6
}

/// A prompt line's right-trim is non-empty and ends with one of `$ # % >`,
/// preceded by a printable word character (so plain text ending in `>`
/// doesn't falsely classify).
fn is_prompt_line(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
        return false;
    }
    let mut chars = trimmed.chars().rev();
    let Some(last) = chars.next() else {
        return false;
    };
    if !matches!(last, '$' | '#' | '%' | '>') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_alphanumeric() || c == '_')
}

/// Scan for alt-screen enter/exit escape sequences, toggling `flag`.
/// `buf` should include a short tail carried over from the previous call
/// so sequences split across chunk boundaries are still detected.
fn scan_alt_screen(buf: &[u8], flag: &mut bool) {
    const ENTER: [&[u8]; 3] = [b"\x1b[?1049h", b"\x1b[?47h", b"\x1b[?1047h"];
    const EXIT: [&[u8]; 3] = [b"\x1b[?1049l", b"\x1b[?47l", b"\x1b[?1047l"];

    let mut positions: Vec<(usize, bool)> = Vec::new();
    for needle in ENTER {
        let mut start = 0;
        while let Some(pos) = find(&buf[start..], needle) {
            positions.push((start + pos, true));
            start += pos + needle.len();
        }
    }
    for needle in EXIT {
        let mut start = 0;
        while let Some(pos) = find(&buf[start..], needle) {
            positions.push((start + pos, false));
            start += pos + needle.len();
        }
    }
    positions.sort_by_key(|(pos, _)| *pos);
    for (_, entering) in positions {
        *flag = entering;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
