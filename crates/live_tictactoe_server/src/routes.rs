//! HTTP routes.

use crate::client::{ClientId, client_id_layer};
use crate::error::ApiError;
use crate::render;
use crate::sse::{game_stream, lobby_stream};
use crate::state::{AppState, GameSummary};
use axum::body::{Body, Bytes};
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router, middleware};
use futures::StreamExt;
use live_tictactoe::{GameId, HistoryControls, MoveOutcome};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/move", post(play_move))
        .route("/games/{id}/board", get(board))
        .route("/games/{id}/history/{offset}", get(history))
        .route("/games/{id}/events", get(game_events))
        .route("/lobby/events", get(lobby_events))
        .layer(
            ServiceBuilder::new()
                .map_request(|req: Request<Body>| {
                    debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                    req
                })
                .layer(middleware::from_fn_with_state(state.clone(), client_id_layer)),
        )
        .with_state(state)
}

/// Body of `POST /games`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedGame {
    /// New game id.
    pub id: GameId,
}

/// Optional body of `POST /games/{id}/join`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Display name; defaults to the client id.
    #[serde(default)]
    pub name: Option<String>,
}

/// Reply to a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Game joined.
    pub game_id: GameId,
    /// `player1`, `player2` or `spectator`.
    pub role: String,
}

/// Form body of `POST /games/{id}/move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveForm {
    /// Cell index 0..=8.
    #[serde(rename = "i", alias = "cell")]
    pub cell: usize,
}

/// Reply to an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    /// Status line after the move.
    pub status: String,
    /// Whether the move ended the game.
    pub game_over: bool,
}

/// A past board with navigation offsets.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    /// Cell symbols, row-major.
    pub cells: Vec<&'static str>,
    /// Navigation state.
    pub controls: HistoryControls,
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    Ok(Html(render::index_page(&state.summaries())?))
}

async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    Json(state.summaries())
}

#[instrument(skip(state))]
async fn create_game(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let game = state.create_game().await?;
    info!(game_id = %game.id(), "🎮 Game created");
    Ok((StatusCode::CREATED, Json(CreatedGame { id: game.id() })))
}

#[instrument(skip(state, client, body), fields(client = %client.0))]
async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    client: ClientId,
    body: Bytes,
) -> Result<Json<JoinResponse>, ApiError> {
    let request: JoinRequest = if body.iter().all(u8::is_ascii_whitespace) {
        JoinRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let game = state.find_game(&id)?;
    let name = request.name.unwrap_or_else(|| client.0.to_string());

    let outcome = state.join(&game, &client.0, &name).await?;
    info!(game_id = %game.id(), role = outcome.role(), "Client joined");
    Ok(Json(JoinResponse {
        game_id: game.id(),
        role: outcome.role().to_string(),
    }))
}

#[instrument(skip(state, client), fields(client = %client.0))]
async fn play_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    client: ClientId,
    form: Result<Form<MoveForm>, FormRejection>,
) -> Result<Json<MoveResponse>, ApiError> {
    let Form(form) = form.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let game = state.find_game(&id)?;
    let outcome = state.play(&game, &client.0, form.cell).await?;
    if let MoveOutcome::Won(slot) = outcome {
        info!(game_id = %game.id(), winner = %slot, "🏆 Game won");
    }
    Ok(Json(MoveResponse {
        status: game.with_game(|g| g.play_status()),
        game_over: outcome.is_terminal(),
    }))
}

async fn board(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let game = state.find_game(&id)?;
    let html = game.with_game(|g| render::to_single_line(|w| render::board(w, g.id(), g.board())))?;
    Ok(Html(html))
}

async fn history(
    State(state): State<AppState>,
    Path((id, offset)): Path<(String, i64)>,
) -> Result<Json<HistoryView>, ApiError> {
    let game = state.find_game(&id)?;
    let view = game.with_game(|g| -> Result<HistoryView, ApiError> {
        let board = g.board_at(offset)?;
        Ok(HistoryView {
            cells: (0..live_tictactoe::CELL_COUNT).map(|i| board.symbol(i)).collect(),
            controls: g.history_controls(offset)?,
        })
    })?;
    Ok(Json(view))
}

#[instrument(skip(state, client), fields(client = %client.0))]
async fn game_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    client: ClientId,
) -> Result<impl IntoResponse, ApiError> {
    let game = state.find_game(&id)?;
    let keep_alive = state.config().keep_alive();
    let frames = game_stream(state, game, client.0).await?;
    info!("📡 Game stream opened");
    Ok(Sse::new(frames.map(|frame| Ok::<_, Infallible>(frame.into_event())))
        .keep_alive(KeepAlive::new().interval(keep_alive)))
}

async fn lobby_events(State(state): State<AppState>) -> impl IntoResponse {
    let keep_alive = state.config().keep_alive();
    let frames = lobby_stream(state);
    Sse::new(frames.map(|frame| Ok::<_, Infallible>(frame.into_event())))
        .keep_alive(KeepAlive::new().interval(keep_alive))
}
