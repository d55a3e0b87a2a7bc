use clap::Parser;
use std::path::PathBuf;

/// Server CLI for blackjack-server
#[derive(Parser, Debug, Clone)]
#[command(name = "blackjack-server", version, about = "Multiplayer blackjack server")]
pub struct ServerCli {
    /// Path to config file
    #[arg(long, default_value = "blackjack-server.toml")]
    pub config: PathBuf,

    /// Listen port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Verbose logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Persist CLI overrides back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,
}
