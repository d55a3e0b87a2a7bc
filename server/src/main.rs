//! Main entry point for the blackjack server.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use blackjack_server::auth::StaticTokens;
use blackjack_server::cli::ServerCli;
use blackjack_server::config::Config;
use blackjack_server::notify::ChannelNotifier;
use blackjack_server::server::run_server;
use blackjack_server::state::AppState;
use blackjack_server::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();

    // Default to info for our crates, warn for everything else to keep
    // noise down.
    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "blackjack_server=info,blackjack_shared=info,warn".to_string()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .with_thread_ids(cli.debug)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();
    let mut cfg = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    // Apply CLI overrides in-memory (non-persistent by default)
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if cli.persist {
        cfg.save(&config_path)
            .with_context(|| format!("saving updated config '{}'", config_path.display()))?;
    }

    tracing::info!(config = %config_path.display(), port = cfg.port, tokens = cfg.tokens.len());
    if cfg.tokens.is_empty() {
        tracing::warn!("no tokens configured, clients will not be able to authenticate");
    }

    let channels = Arc::new(ChannelNotifier::new());
    let store = Arc::new(MemoryStore::new(cfg.starting_credits));
    let auth = Arc::new(StaticTokens::from_config(&cfg.tokens));
    let state = AppState::new(cfg.clone(), channels.clone(), store, auth);

    let port = find_available_port(cfg.port)
        .map_err(|e| anyhow::anyhow!("Could not find an available port: {}", e))?;
    if port != cfg.port {
        tracing::warn!(port, "configured port was not available, using alternative port");
    }
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!(port, "starting server");
    run_server(addr, state, channels).await?;
    Ok(())
}

/// Find the first available port starting from the given port number
fn find_available_port(start_port: u16) -> anyhow::Result<u16> {
    for port in start_port..start_port + 100 {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => return Ok(port),
            Err(_) => continue,
        }
    }
    Err(anyhow::anyhow!(
        "No available ports found in range {}..{}",
        start_port,
        start_port + 100
    ))
}
