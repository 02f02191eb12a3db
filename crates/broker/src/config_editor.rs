// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow, comment-preserving partial writer for the on-disk YAML config
//! (§4.I). Operates at the text level: it locates a dotted key path inside
//! the existing document and splices in a new scalar value, leaving every
//! other line (including comments and blank lines) untouched. It never
//! round-trips the whole file through `serde_yaml`, which would discard
//! comments.

use crate::config::RawConfig;
use crate::error::BrokerError;

/// Walks `update`'s present leaves (tag-dispatched, mirroring [`RawConfig`]'s
/// shape) and splices each one into `yaml_text` in turn.
pub fn apply_partial_update(yaml_text: &str, update: &RawConfig) -> Result<String, BrokerError> {
    let mut text = yaml_text.to_string();

    if let Some(app) = &update.app {
        if let Some(name) = &app.name {
            text = splice_scalar(&text, &["app", "name"], &quote(name))?;
        }
    }
    if let Some(server) = &update.server {
        if let Some(host) = &server.host {
            text = splice_scalar(&text, &["server", "host"], &quote(host))?;
        }
        if let Some(port) = server.port {
            text = splice_scalar(&text, &["server", "port"], &port.to_string())?;
        }
        if let Some(cors) = &server.cors {
            if let Some(origin) = &cors.origin {
                text = splice_scalar(&text, &["server", "cors", "origin"], &flow_seq(origin))?;
            }
            if let Some(credentials) = cors.credentials {
                text = splice_scalar(&text, &["server", "cors", "credentials"], &credentials.to_string())?;
            }
        }
    }
    if let Some(terminal) = &update.terminal {
        if let Some(shell) = &terminal.default_shell {
            text = splice_scalar(&text, &["terminal", "default_shell"], &quote(shell))?;
        }
        if let Some(v) = terminal.max_buffer_size {
            text = splice_scalar(&text, &["terminal", "max_buffer_size"], &v.to_string())?;
        }
        if let Some(v) = terminal.session_timeout {
            text = splice_scalar(&text, &["terminal", "session_timeout"], &v.to_string())?;
        }
        if let Some(v) = terminal.enable_user_control {
            text = splice_scalar(&text, &["terminal", "enable_user_control"], &v.to_string())?;
        }
    }
    if let Some(mcp) = &update.mcp {
        if let Some(v) = &mcp.disabled_tools {
            text = splice_scalar(&text, &["mcp", "disabled_tools"], &flow_seq(v))?;
        }
        if let Some(v) = &mcp.allowed_hosts {
            text = splice_scalar(&text, &["mcp", "allowed_hosts"], &flow_seq(v))?;
        }
        if let Some(v) = mcp.enable_dns_rebinding_protection {
            text = splice_scalar(&text, &["mcp", "enable_dns_rebinding_protection"], &v.to_string())?;
        }
        if let Some(bl) = &mcp.command_blacklist {
            if let Some(v) = bl.case_insensitive {
                text = splice_scalar(&text, &["mcp", "command_blacklist", "case_insensitive"], &v.to_string())?;
            }
            // `rules` is a list of structured objects, not scalars; left to a
            // future structural (not text-splice) editor.
        }
    }
    if let Some(logging) = &update.logging {
        if let Some(v) = &logging.level {
            text = splice_scalar(&text, &["logging", "level"], &quote(v))?;
        }
        if let Some(v) = logging.enable_console {
            text = splice_scalar(&text, &["logging", "enable_console"], &v.to_string())?;
        }
        if let Some(v) = logging.enable_file {
            text = splice_scalar(&text, &["logging", "enable_file"], &v.to_string())?;
        }
        if let Some(v) = &logging.file_path {
            text = splice_scalar(&text, &["logging", "file_path"], &quote(&v.to_string_lossy()))?;
        }
    }

    Ok(text)
}

fn quote(s: &str) -> String {
    format!("{:?}", s)
}

fn flow_seq(items: &[String]) -> String {
    let rendered: Vec<String> = items.iter().map(|i| quote(i)).collect();
    format!("[{}]", rendered.join(", "))
}

/// Splits a line into `(content, trailing_comment)`, where `trailing_comment`
/// includes its leading whitespace and `#`. A `#` inside a quoted scalar is
/// not treated as a comment start.
fn split_comment(line: &str) -> (&str, &str) {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => {
                let content_end = line[..i].trim_end().len();
                return (&line[..content_end], &line[content_end..]);
            }
            _ => {}
        }
    }
    (line, "")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Locates `path` inside `text` by indentation-aware descent (2-space
/// indents, matching the teacher's default config file), and replaces the
/// final key's scalar value while leaving the rest of the line (including
/// any trailing comment) intact. Returns an error if any segment of the
/// path is missing; this editor never invents new mapping keys.
fn splice_scalar(text: &str, path: &[&str], new_value: &str) -> Result<String, BrokerError> {
    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    let mut depth = 0usize;
    let mut search_from = 0usize;

    for (segment_index, segment) in path.iter().enumerate() {
        let expected_indent = depth * 2;
        let is_last = segment_index == path.len() - 1;
        let mut found = None;

        for (i, line) in lines.iter().enumerate().skip(search_from) {
            let (content, _) = split_comment(line);
            if content.trim().is_empty() {
                continue;
            }
            let indent = indent_of(content);
            if indent < expected_indent {
                break;
            }
            if indent != expected_indent {
                continue;
            }
            let trimmed = content.trim_start();
            if let Some(rest) = trimmed.strip_prefix(&format!("{segment}:")) {
                let _ = rest;
                found = Some(i);
                break;
            }
        }

        let line_index = found.ok_or_else(|| {
            BrokerError::not_found(format!(
                "config key path '{}' not found in config file",
                path.join(".")
            ))
        })?;

        if is_last {
            let (content, comment) = split_comment(&lines[line_index]);
            let indent = " ".repeat(indent_of(content));
            lines[line_index] = format!("{indent}{segment}: {new_value}{comment}");
            return Ok(lines.join("\n") + "\n");
        }

        depth += 1;
        search_from = line_index + 1;
    }

    unreachable!("path is non-empty, loop always returns on the last segment")
}

#[cfg(test)]
#[path = "config_editor_tests.rs"]
mod tests;
