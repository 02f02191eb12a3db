// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-addressable output buffer for a single session.
//!
//! Bytes arrive from the PTY and are split into lines, each becoming an
//! [`Entry`] with a strictly-monotonic `sequence`. The buffer is bounded by
//! entry count; past capacity the oldest entries are dropped and readers
//! asking for a `since` below the oldest retained sequence get
//! `truncated=true`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub line_number: u64,
    pub sequence: u64,
}

/// Result of [`OutputBuffer::read`].
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub entries: Vec<Entry>,
    pub total_lines: u64,
    pub has_more: bool,
    pub next_cursor: u64,
    pub truncated: bool,
}

/// Read mode for [`OutputBuffer::read_smart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartMode {
    Head,
    Tail,
    HeadTail,
}

/// Result of [`OutputBuffer::read_smart`].
#[derive(Debug, Clone)]
pub struct SmartReadResult {
    pub head: Vec<Entry>,
    pub tail: Vec<Entry>,
    pub lines_omitted: u64,
    pub total_lines: u64,
    pub truncated: bool,
}

/// Observational snapshot used by `GET .../stats` and `get_stats()`.
#[derive(Debug, Clone, Serialize)]
pub struct BufferStats {
    pub entry_count: usize,
    pub capacity: usize,
    pub total_lines: u64,
    pub oldest_sequence: Option<u64>,
    pub newest_sequence: Option<u64>,
}

/// Bounded, sequence-cursored append buffer. One per [`crate::session::Session`].
pub struct OutputBuffer {
    entries: VecDeque<Entry>,
    capacity: usize,
    next_sequence: u64,
    next_line_number: u64,
    /// Bytes carried over from the previous `append` that did not yet end
    /// in a line terminator.
    pending: Vec<u8>,
    coalesce_spinners: bool,
    animation_throttle: Duration,
    last_coalesce_at: Option<Instant>,
    data_tx: broadcast::Sender<Vec<Entry>>,
}

const DEFAULT_BROADCAST_CAPACITY: usize = 256;

impl OutputBuffer {
    pub fn new(capacity: usize, coalesce_spinners: bool, animation_throttle_ms: u64) -> Self {
        let (data_tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
            next_sequence: 1,
            next_line_number: 1,
            pending: Vec::new(),
            coalesce_spinners,
            animation_throttle: Duration::from_millis(animation_throttle_ms),
            last_coalesce_at: None,
            data_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Entry>> {
        self.data_tx.subscribe()
    }

    /// Split `bytes` into completed lines (normalizing `\r\n` and bare `\r`
    /// to `\n`), append each as a fresh or coalesced [`Entry`], and emit a
    /// `data` event for the batch produced (if any).
    pub fn append(&mut self, bytes: &[u8]) -> Vec<Entry> {
        let normalized = normalize_newlines(bytes);
        self.pending.extend_from_slice(&normalized);

        let mut batch = Vec::new();
        loop {
            let Some(pos) = self.pending.iter().position(|&b| b == b'\n') else {
                break;
            };
            let line_bytes: Vec<u8> = self.pending.drain(..=pos).collect();
            // Drop the trailing newline itself.
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]).into_owned();
            if let Some(entry) = self.push_line(line) {
                batch.push(entry);
            }
        }

        if !batch.is_empty() {
            let _ = self.data_tx.send(batch.clone());
        }
        batch
    }

    /// Force the held-over partial line (if any) into an entry. Used when a
    /// session terminates so its last unterminated line is not lost.
    pub fn flush_partial(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if let Some(entry) = self.push_line(line) {
            let _ = self.data_tx.send(vec![entry]);
        }
    }

    fn push_line(&mut self, content: String) -> Option<Entry> {
        if self.coalesce_spinners {
            if let Some(back) = self.entries.back_mut() {
                let same = back.content.trim() == content.trim();
                let within_throttle = self
                    .last_coalesce_at
                    .map(|t| t.elapsed() < self.animation_throttle)
                    .unwrap_or(false);
                if same && within_throttle {
                    back.content = content;
                    back.timestamp = Utc::now();
                    self.last_coalesce_at = Some(Instant::now());
                    return Some(back.clone());
                }
            }
        }

        let entry = Entry {
            timestamp: Utc::now(),
            content,
            line_number: self.next_line_number,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.next_line_number += 1;
        self.last_coalesce_at = Some(Instant::now());

        self.entries.push_back(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Some(entry)
    }

    fn truncated_for(&self, since: u64) -> bool {
        match self.entries.front() {
            Some(front) => front.sequence > since + 1,
            None => since < self.next_sequence.saturating_sub(1),
        }
    }

    /// Entries with `sequence > since`, capped at `max_lines`.
    pub fn read(&self, since: u64, max_lines: usize) -> ReadResult {
        let truncated = self.truncated_for(since);
        let matching: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| e.sequence > since)
            .collect();
        let has_more = matching.len() > max_lines;
        let entries: Vec<Entry> = matching.into_iter().take(max_lines).cloned().collect();
        let next_cursor = entries.last().map(|e| e.sequence).unwrap_or(since);

        ReadResult {
            entries,
            total_lines: self.next_line_number.saturating_sub(1),
            has_more,
            next_cursor,
            truncated,
        }
    }

    /// Head/tail/head-tail slice over entries with `sequence > since`.
    pub fn read_smart(
        &self,
        since: u64,
        mode: SmartMode,
        max_lines: usize,
        head_lines: usize,
        tail_lines: usize,
    ) -> SmartReadResult {
        let truncated = self.truncated_for(since);
        let matching: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| e.sequence > since)
            .cloned()
            .collect();

        let (head, tail, omitted) = match mode {
            SmartMode::Head => {
                let take = head_lines.min(max_lines).min(matching.len());
                (matching[..take].to_vec(), Vec::new(), 0)
            }
            SmartMode::Tail => {
                let take = tail_lines.min(max_lines).min(matching.len());
                let start = matching.len() - take;
                (Vec::new(), matching[start..].to_vec(), 0)
            }
            SmartMode::HeadTail => {
                let h = head_lines.min(matching.len());
                let remaining = matching.len().saturating_sub(h);
                let t = tail_lines.min(remaining);
                let omitted = matching.len().saturating_sub(h + t);
                let tail_start = matching.len() - t;
                (
                    matching[..h].to_vec(),
                    matching[tail_start..].to_vec(),
                    omitted as u64,
                )
            }
        };

        SmartReadResult {
            head,
            tail,
            lines_omitted: omitted,
            total_lines: self.next_line_number.saturating_sub(1),
            truncated,
        }
    }

    pub fn get_latest(&self, n: usize) -> Vec<Entry> {
        let len = self.entries.len();
        let start = len.saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    pub fn get_stats(&self) -> BufferStats {
        BufferStats {
            entry_count: self.entries.len(),
            capacity: self.capacity,
            total_lines: self.next_line_number.saturating_sub(1),
            oldest_sequence: self.entries.front().map(|e| e.sequence),
            newest_sequence: self.entries.back().map(|e| e.sequence),
        }
    }

    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.saturating_sub(1)
    }
}

/// Normalize `\r\n` and bare `\r` to `\n`. Operates on raw bytes since a
/// multi-byte UTF-8 sequence never contains `\r` or `\n` as a continuation
/// byte, so byte-level scanning is UTF-8-safe here.
fn normalize_newlines(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                out.push(b'\n');
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

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
