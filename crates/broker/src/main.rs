// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use termbroker::blacklist::Blacklist;
use termbroker::config::{Cli, Config};
use termbroker::mcp::TerminalBrokerServer;
use termbroker::registry::Registry;
use termbroker::transport::{http, AppState};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match Config::load(&cli.config) {
        Ok(mut config) => {
            config.apply_cli_overrides(&cli);
            config
        }
        Err(e) => {
            eprintln!("error: failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    match run(config, cli.config.clone()).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Initialized from process-level flags, ahead of the YAML config load, so
/// a config-load failure itself gets a properly formatted log line.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if cli.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
}

async fn run(config: Config, config_path: std::path::PathBuf) -> anyhow::Result<()> {
    let config_path = Arc::new(config_path);
    let config = Arc::new(config);
    let token = CancellationToken::new();

    let registry = Registry::new(
        config.terminal.max_buffer_size,
        true,
        80,
        config.terminal.session_timeout,
    );
    let blacklist = Arc::new(Blacklist::new(
        config.mcp.command_blacklist.rules.clone(),
        config.mcp.command_blacklist.case_insensitive,
    ));

    let state = AppState {
        registry: registry.clone(),
        blacklist: blacklist.clone(),
        config: config.clone(),
        config_path: config_path.clone(),
    };

    let mcp_service = StreamableHttpService::new(
        {
            let registry = registry.clone();
            let blacklist = blacklist.clone();
            move || Ok(TerminalBrokerServer::new(registry.clone(), blacklist.clone()))
        },
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let app = http::router(state).route_service("/mcp", mcp_service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(%addr, "termbroker listening");

    spawn_signal_handlers(token.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;

    info!("shutdown: flushing sessions");
    for summary in registry.list() {
        let _ = registry.kill(&summary.name, termbroker::event::PtySignal::Term);
    }
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    for summary in registry.list() {
        let _ = registry.kill(&summary.name, termbroker::event::PtySignal::Kill);
    }

    Ok(())
}

fn spawn_signal_handlers(token: CancellationToken) {
    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).ok();
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sighup = signal(SignalKind::hangup()).ok();

        tokio::select! {
            _ = async { if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT");
            }
            _ = async { if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGTERM");
            }
            _ = async { if let Some(ref mut s) = sighup { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGHUP");
            }
        }
        token.cancel();
    });
}
