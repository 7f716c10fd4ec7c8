//! Live Tic-Tac-Toe server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use live_tictactoe_server::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,live_tictactoe_server=debug")),
        )
        .init();

    let config = cli.apply(ServerConfig::load(Some(cli.config.as_path()))?);
    info!(
        host = %config.host(),
        port = config.port(),
        seed_demo = config.seed_demo_game(),
        "🔧 Starting Live Tic-Tac-Toe server"
    );

    live_tictactoe_server::serve(config).await
}
