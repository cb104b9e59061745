//! cfgplane daemon
//!
//! Serves the config and placement API on one listener and the node reply
//! webhooks on another.

use cfgplane_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// cfgplane daemon CLI
#[derive(Parser)]
#[command(name = "cfgplaned")]
#[command(about = "cfgplane - config distribution control plane", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CFGPLANE_CONFIG")]
    config: Option<String>,

    /// API listen address
    #[arg(short, long, env = "CFGPLANE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Reply webhook listen address
    #[arg(long, env = "CFGPLANE_WEBHOOK_ADDR")]
    webhook_listen: Option<String>,

    /// Log level
    #[arg(long, env = "CFGPLANE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CFGPLANE_LOG_JSON")]
    json: bool,
}

fn parse_addr(value: &str, what: &str) -> DaemonResult<std::net::SocketAddr> {
    value
        .parse()
        .map_err(|e| DaemonError::Config(format!("Invalid {what} address: {e}")))
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = parse_addr(listen, "listen")?;
    }
    if let Some(listen) = &cli.webhook_listen {
        config.server.webhook_addr = parse_addr(listen, "webhook")?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.server.listen_addr,
        webhooks = %config.server.webhook_addr,
        webhook_base_url = %config.placement.webhook_base_url,
        "Starting cfgplane daemon"
    );

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
