// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::blacklist::Rule;

/// Process-level startup flags, orthogonal to the on-disk YAML config
/// (`Config`, below). These cover what a YAML file cannot express at
/// process-start time: where the file lives, and early logger setup.
#[derive(Debug, Parser)]
#[command(name = "termbroker", version, about = "Interactive terminal broker.")]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, env = "TERMBROKER_CONFIG", default_value = "termbroker.yaml")]
    pub config: PathBuf,

    /// Override `server.port` from the config file.
    #[arg(long, env = "TERMBROKER_PORT")]
    pub port: Option<u16>,

    /// Log format (json or text).
    #[arg(long, env = "TERMBROKER_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TERMBROKER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// `server.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub origin: Vec<String>,
    pub credentials: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1106,
            cors: CorsConfig {
                origin: vec![
                    "http://localhost:1107".to_string(),
                    "http://127.0.0.1:1107".to_string(),
                ],
                credentials: true,
            },
        }
    }
}

/// `terminal.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub default_shell: Option<String>,
    pub max_buffer_size: usize,
    pub session_timeout: u64,
    pub enable_user_control: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_shell: None,
            max_buffer_size: 10_000,
            session_timeout: 86_400_000,
            enable_user_control: false,
        }
    }
}

/// `mcp.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub disabled_tools: Vec<String>,
    pub allowed_hosts: Vec<String>,
    pub enable_dns_rebinding_protection: bool,
    pub command_blacklist: CommandBlacklistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandBlacklistConfig {
    pub case_insensitive: bool,
    pub rules: Vec<Rule>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            disabled_tools: Vec::new(),
            allowed_hosts: vec![
                "127.0.0.1".to_string(),
                "localhost".to_string(),
                "localhost:1106".to_string(),
            ],
            enable_dns_rebinding_protection: false,
            command_blacklist: CommandBlacklistConfig {
                case_insensitive: true,
                rules: Vec::new(),
            },
        }
    }
}

/// `logging.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub enable_console: bool,
    pub enable_file: bool,
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_console: true,
            enable_file: false,
            file_path: None,
        }
    }
}

/// `app.*`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub name: Option<String>,
}

/// The fully-typed, merged configuration. Process-wide singleton, held as
/// `Arc<Config>` and passed by reference to every component (§5).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mirrors [`Config`] but with every leaf optional, so a partial YAML
/// document can be deep-merged over [`Config::default`] without requiring
/// every key to be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub app: Option<RawAppConfig>,
    #[serde(default)]
    pub server: Option<RawServerConfig>,
    #[serde(default)]
    pub terminal: Option<RawTerminalConfig>,
    #[serde(default)]
    pub mcp: Option<RawMcpConfig>,
    #[serde(default)]
    pub logging: Option<RawLoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAppConfig {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors: Option<RawCorsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCorsConfig {
    pub origin: Option<Vec<String>>,
    pub credentials: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTerminalConfig {
    pub default_shell: Option<String>,
    pub max_buffer_size: Option<usize>,
    pub session_timeout: Option<u64>,
    pub enable_user_control: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMcpConfig {
    pub disabled_tools: Option<Vec<String>>,
    pub allowed_hosts: Option<Vec<String>>,
    pub enable_dns_rebinding_protection: Option<bool>,
    pub command_blacklist: Option<RawCommandBlacklistConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommandBlacklistConfig {
    pub case_insensitive: Option<bool>,
    pub rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub enable_console: Option<bool>,
    pub enable_file: Option<bool>,
    pub file_path: Option<PathBuf>,
}

impl Config {
    /// Load a YAML file from `path`, deep-merging it over [`Config::default`].
    /// A missing file is treated as an empty document (defaults only).
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(text) => serde_yaml::from_str::<RawConfig>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::merge(raw))
    }

    fn merge(raw: RawConfig) -> Self {
        let mut config = Config::default();

        if let Some(app) = raw.app {
            config.app.name = app.name.or(config.app.name);
        }
        if let Some(server) = raw.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
            if let Some(cors) = server.cors {
                if let Some(origin) = cors.origin {
                    config.server.cors.origin = origin;
                }
                if let Some(credentials) = cors.credentials {
                    config.server.cors.credentials = credentials;
                }
            }
        }
        if let Some(terminal) = raw.terminal {
            if terminal.default_shell.is_some() {
                config.terminal.default_shell = terminal.default_shell;
            }
            if let Some(v) = terminal.max_buffer_size {
                config.terminal.max_buffer_size = v;
            }
            if let Some(v) = terminal.session_timeout {
                config.terminal.session_timeout = v;
            }
            if let Some(v) = terminal.enable_user_control {
                config.terminal.enable_user_control = v;
            }
        }
        if let Some(mcp) = raw.mcp {
            if let Some(v) = mcp.disabled_tools {
                config.mcp.disabled_tools = v;
            }
            if let Some(v) = mcp.allowed_hosts {
                config.mcp.allowed_hosts = v;
            }
            if let Some(v) = mcp.enable_dns_rebinding_protection {
                config.mcp.enable_dns_rebinding_protection = v;
            }
            if let Some(bl) = mcp.command_blacklist {
                if let Some(v) = bl.case_insensitive {
                    config.mcp.command_blacklist.case_insensitive = v;
                }
                if let Some(v) = bl.rules {
                    config.mcp.command_blacklist.rules = v;
                }
            }
        }
        if let Some(logging) = raw.logging {
            if let Some(v) = logging.level {
                config.logging.level = v;
            }
            if let Some(v) = logging.enable_console {
                config.logging.enable_console = v;
            }
            if let Some(v) = logging.enable_file {
                config.logging.enable_file = v;
            }
            if logging.file_path.is_some() {
                config.logging.file_path = logging.file_path;
            }
        }

        config
    }

    /// Apply the CLI's `--port` override, if set, on top of the loaded config.
    pub fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
