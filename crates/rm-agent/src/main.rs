//! # Resource Gateway Agent
//!
//! Entry point of the stdio tool server.
//!
//! ## Startup Sequence
//!
//! 1. Parse flags
//! 2. Load configuration (defaults, optional JSON file, environment, flags)
//! 3. Install the stderr subscriber
//! 4. Build gateway, router and tool set
//! 5. Serve stdin/stdout until EOF or Ctrl+C, then stop the admission sweep

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rm_agent::ToolServer;
use rm_gateway::{Gateway, GatewayConfig, Router, ToolSet};
use rm_telemetry::{init_telemetry, TelemetryConfig};
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rm-agent")]
#[command(about = "Tool server for a resource-management API over stdio", long_about = None)]
struct Cli {
    /// Upstream API base URL (overrides RM_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Upstream bearer token (overrides RM_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// JSON configuration file, applied before the environment
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the tool definitions as JSON and exit
    #[arg(long)]
    print_tools: bool,
}

/// Load configuration: defaults, then file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };

    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;

    if let Some(url) = &cli.base_url {
        config.api.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.api.token = token.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize logging")?;

    if config.api.token.is_empty() {
        warn!("No API token configured; upstream calls are sent without credentials");
    }

    let gateway = Arc::new(Gateway::connect(config).context("Failed to build HTTP client")?);
    let tools = ToolSet::new(Router::new(Arc::clone(&gateway)));

    if cli.print_tools {
        let definitions = serde_json::to_string_pretty(&tools.definitions())
            .context("Failed to serialize tool definitions")?;
        println!("{}", definitions);
        gateway.shutdown();
        return Ok(());
    }

    info!(
        base_url = %gateway.config().api.base_url,
        max_requests = gateway.config().rate_limit.max_requests,
        window_ms = gateway.config().rate_limit.window.as_millis() as u64,
        "Tool server ready on stdio"
    );

    let server = Arc::new(ToolServer::new(tools));
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    tokio::select! {
        result = server.serve(reader, writer) => {
            result.context("Stdio transport failed")?;
            info!("Client closed the connection");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received");
        }
    }

    gateway.shutdown();
    info!("Shutdown complete");
    Ok(())
}
