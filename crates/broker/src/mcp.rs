// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent tool protocol layer (§4.G): a single `interact_with_terminal` MCP
//! tool plus read-only resources, served over `rmcp`'s streamable-HTTP
//! transport so it shares the axum router with the HTTP gateway at `/mcp`.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{
    CallToolResult, Content, ErrorData as McpError, Implementation, ListResourcesResult,
    ProtocolVersion, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
    ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::blacklist::Blacklist;
use crate::interact::{self, InteractRequest, KeyOrTextInput, ReadMode, WaitOptions};
use crate::registry::Registry;

/// Input schema for the `interact_with_terminal` tool. Mirrors
/// [`InteractRequest`] field-for-field so the JSON-RPC schema and the HTTP
/// request body never drift apart.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InteractWithTerminalParams {
    pub terminal_name: String,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub append_newline: Option<bool>,
    #[serde(default)]
    pub special_operation: Option<String>,
    #[serde(default)]
    pub keys: Option<String>,
    #[serde(default)]
    pub key_sequence: Option<Vec<KeyOrTextInput>>,
    #[serde(default)]
    pub since: Option<u64>,
    #[serde(default)]
    pub max_lines: Option<usize>,
    #[serde(default)]
    pub mode: Option<ReadMode>,
    #[serde(default)]
    pub head_lines: Option<usize>,
    #[serde(default)]
    pub tail_lines: Option<usize>,
    #[serde(default)]
    pub strip_spinner: Option<bool>,
    #[serde(default)]
    pub wait: Option<WaitOptions>,
    #[serde(default)]
    pub list_terminals: Option<bool>,
    #[serde(default)]
    pub kill_terminal: Option<bool>,
    #[serde(default)]
    pub signal: Option<String>,
}

impl From<InteractWithTerminalParams> for InteractRequest {
    fn from(params: InteractWithTerminalParams) -> Self {
        InteractRequest {
            terminal_name: params.terminal_name,
            shell: params.shell,
            cwd: params.cwd,
            env: params.env,
            input: params.input,
            append_newline: params.append_newline,
            special_operation: params.special_operation,
            keys: params.keys,
            key_sequence: params.key_sequence,
            since: params.since.unwrap_or(0),
            max_lines: params.max_lines.unwrap_or(500),
            mode: params.mode.unwrap_or_default(),
            head_lines: params.head_lines.unwrap_or(0),
            tail_lines: params.tail_lines.unwrap_or(0),
            strip_spinner: params.strip_spinner.unwrap_or(false),
            wait: params.wait.unwrap_or_default(),
        }
    }
}

/// Server-side state for the MCP tool surface: the session registry and
/// the configured command blacklist, shared with the HTTP gateway.
#[derive(Clone)]
pub struct TerminalBrokerServer {
    registry: Arc<Registry>,
    blacklist: Arc<Blacklist>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TerminalBrokerServer {
    pub fn new(registry: Arc<Registry>, blacklist: Arc<Blacklist>) -> Self {
        Self {
            registry,
            blacklist,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Write input to (or create) a named interactive terminal, optionally wait for a condition, and read back its output."
    )]
    async fn interact_with_terminal(
        &self,
        Parameters(params): Parameters<InteractWithTerminalParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.list_terminals.unwrap_or(false) {
            let sessions = interact::list_terminals(&self.registry);
            let json = serde_json::to_value(&sessions)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            return Ok(CallToolResult::success(vec![Content::text(
                serde_json::to_string_pretty(&json).unwrap_or_default(),
            )]));
        }

        if params.kill_terminal.unwrap_or(false) {
            interact::kill_terminal(
                &self.registry,
                &params.terminal_name,
                params.signal.as_deref(),
            )
            .map_err(|e| McpError::invalid_params(e.message, None))?;
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "terminal '{}' killed",
                params.terminal_name
            ))]));
        }

        let req: InteractRequest = params.into();
        let result = interact::interact(&self.registry, &self.blacklist, req)
            .await
            .map_err(|e| McpError::invalid_params(e.message.clone(), Some(e.body())))?;

        let structured = serde_json::to_value(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(
            result.command_output.clone(),
        )])
        .with_structured_content(structured))
    }
}

#[tool_handler]
impl ServerHandler for TerminalBrokerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "termbroker".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Use interact_with_terminal to create, write to, and read from named interactive terminal sessions.".to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut resources = vec![Resource::new(
            RawResource::new("terminal://sessions", "sessions"),
            None,
        )];
        for summary in interact::list_terminals(&self.registry) {
            resources.push(Resource::new(
                RawResource::new(format!("terminal://sessions/{}/output", summary.name), summary.name),
                None,
            ));
        }
        resources.push(Resource::new(
            RawResource::new("terminal://stats", "stats"),
            None,
        ));
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let uri = request.uri.as_str();

        if uri == "terminal://sessions" {
            let sessions = interact::list_terminals(&self.registry);
            let text = serde_json::to_string_pretty(&sessions).unwrap_or_default();
            return Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(text, uri)],
            });
        }

        if uri == "terminal://stats" {
            let stats = self.registry.stats();
            let text = serde_json::to_string_pretty(&stats).unwrap_or_default();
            return Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(text, uri)],
            });
        }

        if let Some(name) = uri
            .strip_prefix("terminal://sessions/")
            .and_then(|rest| rest.strip_suffix("/output"))
        {
            let session = self
                .registry
                .resolve(name)
                .map_err(|e| McpError::resource_not_found(e.message, None))?;
            let result = session.read(0, 10_000);
            let text = result
                .entries
                .iter()
                .map(|e| e.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(text, uri)],
            });
        }

        Err(McpError::resource_not_found(
            format!("unknown resource: {uri}"),
            None,
        ))
    }
}
