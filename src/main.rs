use anyhow::{anyhow, bail, Result};
use clap::Parser;
use esg_gateway::config::{GatewayConfig, LoggingConfig};
use esg_gateway::{logging, Dispatcher, ForwardingClient, GatewayServer, ServiceRegistry};
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser)]
#[clap(
    version = "0.1.0",
    about = "HTTP gateway that routes inbound requests to the ESG analysis backends"
)]
struct Args {
    #[clap(short, long, value_name = "ADDR", help = "Listen address (e.g., 0.0.0.0:8080)")]
    listen: Option<String>,

    #[clap(short, long, value_name = "FILE", help = "Configuration file path")]
    config: Option<String>,

    #[clap(long, value_name = "SECONDS", help = "Per-call backend timeout in seconds")]
    timeout: Option<u64>,

    #[clap(long, value_name = "PREFIX", help = "Mount the gateway under this path prefix (e.g., /e/v2)")]
    route_prefix: Option<String>,

    #[clap(long, value_name = "LEVEL", help = "Log level: trace, debug, info, warn, error")]
    log_level: Option<String>,

    #[clap(long, value_name = "FORMAT", help = "Log format: text or json")]
    log_format: Option<String>,

    #[clap(long, value_name = "FILE", help = "Generate a sample configuration file")]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(config_file) = args.generate_config {
        generate_sample_config(&config_file)?;
        println!("Sample configuration file generated: {}", config_file);
        return Ok(());
    }

    // File configuration wins over the environment; CLI flags win over both.
    let mut config = if let Some(config_file) = &args.config {
        if !Path::new(config_file).exists() {
            bail!("configuration file not found: {}", config_file);
        }
        GatewayConfig::from_file(config_file).map_err(|e| anyhow!("{}", e))?
    } else {
        GatewayConfig::from_env()
    };

    if let Some(listen) = &args.listen {
        config.listen_addr = listen
            .parse()
            .map_err(|e| anyhow!("invalid listen address '{}': {}", listen, e))?;
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(prefix) = args.route_prefix {
        config.route_prefix = Some(prefix);
    }
    if args.log_level.is_some() || args.log_format.is_some() {
        let mut logging_config = config.logging.clone().unwrap_or_else(LoggingConfig::default);
        if let Some(level) = &args.log_level {
            logging_config.level = Some(logging::parse_log_level(level).map_err(|e| anyhow!("{}", e))?);
        }
        if let Some(format) = &args.log_format {
            logging_config.format =
                Some(logging::parse_log_format(format).map_err(|e| anyhow!("{}", e))?);
        }
        config.logging = Some(logging_config);
    }

    logging::init(config.logging.as_ref()).map_err(|e| anyhow!("{}", e))?;

    info!("starting gateway...");

    // Fail fast: a missing or unparseable backend address is a configuration
    // bug and must never become a per-request error.
    let registry = Arc::new(ServiceRegistry::from_config(&config)?);
    let client = ForwardingClient::new(&config);
    let dispatcher = Arc::new(Dispatcher::new(registry, client));
    let server = GatewayServer::bind(&config, dispatcher).await?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            eprintln!("Server error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down gracefully...");
        }
        result = server_handle => {
            if let Err(e) = result {
                eprintln!("Server task error: {}", e);
            }
        }
    }

    info!("gateway stopped");
    Ok(())
}

fn generate_sample_config(file_path: &str) -> Result<()> {
    let sample = r#"{
  "listen_addr": "0.0.0.0:8080",
  "request_timeout_secs": 30,
  "pool_max_idle_per_host": 10,
  "pool_idle_timeout_secs": 90,
  "route_prefix": "/e/v2",
  "backends": {
    "news": "http://localhost:8001",
    "issuepool": "http://localhost:8002",
    "sasb": "http://localhost:8003",
    "watchdog": "http://localhost:8004"
  },
  "logging": {
    "level": "info",
    "format": "text"
  }
}"#;

    std::fs::write(file_path, sample)?;
    Ok(())
}
