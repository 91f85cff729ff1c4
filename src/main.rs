use anyhow::Result;
use prediction_server::{config, executor::stdio, server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// First argument that turns the binary into a delegated executor child.
const STDIO_MODE_ARG: &str = "serve-stdio";

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let stdio_mode = std::env::args().nth(1).as_deref() == Some(STDIO_MODE_ARG);

    // Configuration problems must stop the process before any socket is opened.
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Determine log level: environment variable overrides config
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.server.logs.level.clone());

    // RUST_LOG may carry a full directive list; only validate plain levels.
    if !log_level.contains('=') {
        if let Err(e) = validate_log_level(&log_level) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    // stdout carries the response stream in stdio mode, so logs always go to stderr.
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    if stdio_mode {
        info!("Starting prediction executor on stdio");
        stdio::run(config).await?;
        return Ok(());
    }

    info!(
        "Starting prediction server with log level: {}",
        log_level
    );
    info!("Configuration loaded successfully");

    server::run(config).await?;

    Ok(())
}
