//! SIEM Log Aggregator Service
//! Merges the IDS feeds into one normalized log API for the dashboard

use anyhow::{Context, Result};
use clap::{Arg, Command};
use siem_log_aggregator::config::Config;
use siem_log_aggregator::{create_router, Aggregator, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let matches = Command::new("log_aggregator")
        .version(env!("CARGO_PKG_VERSION"))
        .author("SIEM Team")
        .about("Multi-source IDS log aggregation service")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Server host"),
        )
        .arg(
            Arg::new("validate-config")
                .long("validate-config")
                .help("Validate configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    // Load configuration
    info!("Loading configuration from: {}", config_path);
    let mut config = Config::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // Override with command line arguments
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }

    // Validate configuration
    config
        .validate()
        .context("Configuration validation failed")?;

    if matches.get_flag("validate-config") {
        info!("Configuration is valid");
        return Ok(());
    }

    let config = Arc::new(config);

    let aggregator = Aggregator::from_config(&config).context("Failed to initialize source adapters")?;
    let app = create_router(AppState::new(config.clone(), Arc::new(aggregator)));

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid server host")?,
        config.server.port,
    );

    info!("Starting SIEM Log Aggregator on {}", addr);
    info!("Logs API: http://{}/api/logs", addr);
    info!("Health Check: http://{}/health", addr);

    // Print configuration summary
    print_config_summary(&config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siem_log_aggregator=info,log_aggregator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Print configuration summary
fn print_config_summary(config: &Config) {
    let sources = &config.sources;
    info!("=== Configuration Summary ===");
    info!("Server: {}:{}", config.server.host, config.server.port);
    info!("Environment: {:?}", config.environment);
    info!("Host-IDS: {} ({}s)", sources.host_ids.url, sources.host_ids.timeout_secs);
    info!("Network-IDS: {} ({}s)", sources.network_ids.url, sources.network_ids.timeout_secs);
    info!("Correlation: {} ({}s)", sources.correlation.url, sources.correlation.timeout_secs);
    info!("Limits: default {}, max {}", config.limits.default_limit, config.limits.max_limit);
    info!("Request Timeout: {}s", config.server.request_timeout_secs);
    info!("CORS: {}", if config.server.enable_cors { "enabled" } else { "disabled" });
    info!("================================");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
