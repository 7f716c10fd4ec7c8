//! Command-line interface for live_tictactoe_server.

use clap::Parser;
use live_tictactoe_server::ServerConfig;
use std::path::PathBuf;

/// Live Tic-Tac-Toe - multiplayer game server with live updates
#[derive(Parser, Debug)]
#[command(name = "live_tictactoe_server")]
#[command(about = "Multiplayer tic-tac-toe over HTTP and Server-Sent Events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "live_tictactoe.toml")]
    pub config: PathBuf,

    /// Host to bind to (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides the config file and $PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Create a finished demo game at startup
    #[arg(long)]
    pub seed_demo: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file config.
    pub fn apply(&self, config: ServerConfig) -> ServerConfig {
        let port = self.port.or_else(|| {
            std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
        });

        let mut config = config;
        if let Some(host) = &self.host {
            config = config.with_host(host.as_str());
        }
        if let Some(port) = port {
            config = config.with_port(port);
        }
        if self.seed_demo {
            config = config.with_seed_demo_game(true);
        }
        config
    }
}
