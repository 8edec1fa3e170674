//! Pawhaven reference backend

use anyhow::Context;
use clap::Parser;
use pawhaven_core::{init_logging, LoggingConfig};
use pawhaven_server::{PawhavenServer, ServerConfig};

/// Pawhaven reference backend - serves the /auth API for local development
#[derive(Parser)]
#[command(name = "pawhaven-server")]
#[command(version)]
struct Args {
    /// Server host to bind to (overrides PAWHAVEN_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on (overrides PAWHAVEN_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = LoggingConfig {
        level: format!("pawhaven_server={},tower_http=debug", args.log_level),
        ..Default::default()
    };
    init_logging(&logging).map_err(|e| anyhow::anyhow!(e))?;

    let mut config = ServerConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let server = PawhavenServer::new(config)
        .await
        .context("Failed to build server")?;
    server.start().await.context("Server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["pawhaven-server"]);
        assert_eq!(args.host, None);
        assert_eq!(args.port, None);
        assert_eq!(args.log_level, "info");

        let args = Args::parse_from(["pawhaven-server", "--host", "0.0.0.0", "--port", "5050"]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(5050));
    }
}
