//! esbuild-mcp CLI entry point.
//!
//! Serves the esbuild tools over JSON-RPC on HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use esbuild_mcp_common::ConfigFile;
use esbuild_mcp_server::{McpServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "esbuild-mcp", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file.
    #[arg(long, env = "ESBUILD_MCP_BIND")]
    bind: Option<SocketAddr>,

    /// Engine module loaded when a tool names no module.
    #[arg(long, env = "ESBUILD_MCP_MODULE")]
    module: Option<PathBuf>,

    /// Load the engine before accepting requests.
    #[arg(long)]
    preload: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,esbuild_mcp=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!("Starting esbuild-mcp");

    let mut file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ConfigFile::default(),
    };

    if let Some(module) = cli.module {
        file.runtime.engine.default_module_path = module;
    }

    let mut server_config =
        ServerConfig::try_from(&file.server).context("Invalid [server] section")?;
    if let Some(bind) = cli.bind {
        server_config = server_config.with_bind_addr(bind);
    }
    if cli.preload {
        server_config = server_config.with_preload(true);
    }

    info!(
        bind_addr = %server_config.bind_addr,
        module = %file.runtime.engine.default_module_path.display(),
        preload = server_config.preload,
        "Configuration loaded"
    );

    let server = McpServer::new(&file.runtime, server_config)?;

    info!("Server initialized. Available endpoints:");
    info!("  POST /mcp     - JSON-RPC tool calls");
    info!("  GET  /health  - Health check");
    info!("  GET  /ready   - Readiness check");

    server.run().await?;

    Ok(())
}
