//! api-bridge MCP server
//!
//! Speaks MCP over stdio. Logs go to stderr so stdout carries only protocol
//! messages.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bridge_core::{default_data_dir, Gateway, SettingsManager};
use mcp_server::McpServer;

/// Let AI agents call registered HTTP APIs with stored credentials
#[derive(Parser, Debug)]
#[command(name = "api-bridge-mcp")]
#[command(version)]
#[command(about = "MCP server for calling whitelisted HTTP APIs with managed credentials")]
struct Args {
    /// Directory holding settings.json and the credential/API doc store
    #[arg(long, env = "API_BRIDGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Timeout for outbound HTTP requests, overriding settings.json
    #[arg(long, env = "API_BRIDGE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let mut settings_manager = SettingsManager::new(&data_dir);
    // Write the defaults once so there is a settings.json to edit
    if !settings_manager.is_persisted() {
        settings_manager
            .save()
            .await
            .context("failed to write default settings")?;
    }
    if let Some(timeout) = args.timeout_secs {
        settings_manager.get_mut().request_timeout_secs = timeout;
    }
    let settings = settings_manager.get().clone();

    info!("Using data directory {}", data_dir.display());

    let gateway = Gateway::open(&data_dir, settings)
        .await
        .context("failed to open gateway")?;

    McpServer::new(Arc::new(gateway)).run().await
}
