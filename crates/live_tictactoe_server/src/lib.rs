//! Live tic-tac-toe server.
//!
//! Serves games over HTTP and pushes updates to browsers with Server-Sent
//! Events. Each game has its own lock and its own event hub; the lobby has
//! one more hub for game list updates.
//!
//! # Architecture
//!
//! ```text
//! POST /games/{id}/move ─► AppState::play ─► game hub ─► one queue per SSE stream
//!                                        └─► lobby hub ─► one queue per lobby stream
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod client;
pub mod config;
pub mod connections;
pub mod error;
pub mod events;
pub mod render;
pub mod routes;
pub mod sse;
pub mod state;

pub use bus::{BusError, Hub, ListenerId, Subscription};
pub use client::ClientId;
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use events::{GamePlayEvent, GamePlayEventKind, GameStatusEvent};
pub use routes::router;
pub use sse::SseFrame;
pub use state::{AppState, GameSummary, LiveGame, StreamRegistration};

use tokio::net::TcpListener;
use tracing::{info, instrument};

/// Binds the configured address and serves until the process exits.
#[instrument(skip(config), fields(addr = %config.bind_address()))]
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(config);

    if *state.config().seed_demo_game() {
        let id = state.seed_demo_game().await?;
        info!(game_id = %id, "🧪 Demo game ready");
    }

    let listener = TcpListener::bind(state.config().bind_address()).await?;
    let app = router(state.clone());

    info!("✅ Server ready at http://{}/", state.config().bind_address());
    info!("📡 Accepting SSE connections");
    axum::serve(listener, app).await?;
    Ok(())
}
