//! capitals-chat server binary.
//!
//! Serves the EU capitals chat bot on TCP or UDP. Configuration comes
//! from CLI arguments or a TOML file.

use capitals_chat::config::{Config, TransportType};
use capitals_chat::{server, udp, AnswerEngine};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Built once, shared read-only by every session
    let engine = Arc::new(AnswerEngine::new());

    info!(
        host = %config.host,
        port = config.port,
        transport = ?config.transport,
        max_connections = config.max_connections,
        entries = engine.len(),
        "Starting capitals-chat server"
    );

    match config.transport {
        TransportType::Tcp => server::serve(&config, engine).await?,
        TransportType::Udp => udp::serve(&config, engine).await?,
    }

    Ok(())
}
