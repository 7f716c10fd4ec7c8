//! Server-Sent Event streams for game pages and the lobby.
//!
//! A game stream opens with a `first-join` frame holding the whole game
//! view, then turns each hub event into zero or more named frames:
//!
//! | Event                       | Frame        | Data                 |
//! |-----------------------------|--------------|----------------------|
//! | player/spectator join/leave | `clients`    | participant list     |
//! | move played                 | `cell_<n>`   | the updated cell     |
//! | game over                   | `game_over`  | empty                |
//! | render failure              | `error`      | error message        |
//!
//! Dropping the stream unregisters the listener. When it was the viewer's
//! last open stream, the viewer is marked disconnected and a leave event is
//! published.

use crate::bus::{Hub, ListenerId, Subscription};
use crate::events::{GamePlayEvent, GamePlayEventKind, GameStatusEvent};
use crate::render::{self, single_line, to_single_line};
use crate::state::{AppState, LiveGame};
use crate::error::ApiError;
use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use live_tictactoe::{Game, ParticipantId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One named SSE frame. `data` never contains a line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    name: String,
    data: String,
}

impl SseFrame {
    /// Builds a frame, stripping line breaks from both fields.
    pub fn new(name: impl AsRef<str>, data: impl AsRef<str>) -> Self {
        Self {
            name: single_line(name.as_ref()),
            data: single_line(data.as_ref()),
        }
    }

    /// An `error` frame carrying `message`.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::new("error", message.to_string())
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Converts into an axum SSE event.
    pub fn into_event(self) -> Event {
        Event::default().event(self.name).data(self.data)
    }
}

impl fmt::Display for SseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event: {}\ndata: {}\n\n", self.name, self.data)
    }
}

/// Full game view for a newly connected viewer.
pub fn first_join_frame(game: &Game, viewer: &ParticipantId) -> SseFrame {
    match to_single_line(|w| render::game_partial(w, game, viewer)) {
        Ok(html) => SseFrame::new("first-join", html),
        Err(e) => SseFrame::error(ApiError::from(e)),
    }
}

/// Frames a viewer receives for one gameplay event.
pub fn frames_for(event: &GamePlayEvent, game: &Game, viewer: &ParticipantId) -> Vec<SseFrame> {
    match &event.kind {
        GamePlayEventKind::Invalid => {
            warn!(game_id = %event.game_id, info = %event.info, "Invalid event");
            Vec::new()
        }
        kind if kind.affects_participants() => {
            match to_single_line(|w| render::clients(w, game, viewer)) {
                Ok(html) => vec![SseFrame::new("clients", html)],
                Err(e) => vec![SseFrame::error(ApiError::from(e))],
            }
        }
        GamePlayEventKind::MovePlayed(played) => {
            let rendered = game
                .cell(played.cell)
                .map_err(ApiError::from)
                .and_then(|cell| Ok(to_single_line(|w| render::cell(w, &cell))?));
            match rendered {
                Ok(html) => vec![SseFrame::new(format!("cell_{}", played.cell), html)],
                Err(e) => vec![SseFrame::error(e)],
            }
        }
        GamePlayEventKind::GameOver => vec![SseFrame::new("game_over", "")],
        kind => {
            debug!(%kind, "Unhandled event");
            Vec::new()
        }
    }
}

/// Opens the event stream for `viewer` on `game`.
///
/// Joins the viewer first, so a fresh client takes a free player slot or
/// becomes a spectator.
#[instrument(skip(state, game), fields(game_id = %game.id()))]
pub async fn game_stream(
    state: AppState,
    game: Arc<LiveGame>,
    viewer: ParticipantId,
) -> Result<impl Stream<Item = SseFrame> + Send + 'static, ApiError> {
    let (outcome, subscription, registration) = state.open_stream(&game, &viewer).await?;
    debug!(%viewer, role = outcome.role(), "Game stream started");

    let first = game.with_game(|g| first_join_frame(g, &viewer));
    let updates = stream::unfold(
        (subscription, registration),
        |(mut subscription, registration)| async move {
            let event = subscription.recv().await?;
            let frames = registration
                .game()
                .with_game(|g| frames_for(&event, g, registration.viewer()));
            Some((stream::iter(frames), (subscription, registration)))
        },
    )
    .flatten();

    Ok(stream::once(async move { first }).chain(updates))
}

/// Unregisters a lobby listener when dropped.
struct LobbyGuard {
    hub: Hub<GameStatusEvent>,
    listener: ListenerId,
}

impl Drop for LobbyGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.listener);
    }
}

/// `game_update` frames carrying the refreshed game list.
pub fn lobby_stream(state: AppState) -> impl Stream<Item = SseFrame> + Send + 'static {
    let subscription: Subscription<GameStatusEvent> = state.lobby().subscribe();
    let guard = LobbyGuard {
        hub: state.lobby().clone(),
        listener: subscription.id(),
    };
    debug!(listener = %guard.listener, "Lobby stream started");

    stream::unfold(
        (state, subscription, guard),
        |(state, mut subscription, guard)| async move {
            let event = subscription.recv().await?;
            debug!(game_id = %event.game_id, info = %event.info, "Lobby update");
            let frame = match to_single_line(|w| render::game_list(w, &state.summaries())) {
                Ok(html) => SseFrame::new("game_update", html),
                Err(e) => SseFrame::error(ApiError::from(e)),
            };
            Some((frame, (state, subscription, guard)))
        },
    )
}
