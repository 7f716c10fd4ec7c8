//! Shared server state: the game table and the event hubs.
//!
//! The table itself sits behind one mutex that is only held long enough to
//! insert or look up a game. Each game carries its own mutex and its own
//! gameplay hub, so play in one game never waits on another.

use crate::bus::{Hub, ListenerId, Subscription};
use crate::config::ServerConfig;
use crate::connections::ConnectionRegistry;
use crate::error::ApiError;
use crate::events::{GamePlayEvent, GamePlayEventKind, GameStatusEvent};
use live_tictactoe::{
    Game, GameError, GameId, GamePhase, JoinOutcome, MoveOutcome, ParticipantId,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// One row of the game listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    /// Game id.
    pub id: GameId,
    /// Status line, e.g. `"Playing Alice vs Bob"`.
    pub info: String,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Spectators ever joined.
    pub spectators: usize,
}

impl GameSummary {
    /// Summarizes a game.
    pub fn of(game: &Game) -> Self {
        Self {
            id: game.id(),
            info: game.info(),
            phase: game.phase(),
            spectators: game.participants().spectators().count(),
        }
    }
}

/// Mutable part of a live game.
#[derive(Debug)]
pub struct GameRoom {
    /// Rules state.
    pub game: Game,
    /// Open streams per participant.
    pub connections: ConnectionRegistry,
}

/// A game plus its gameplay hub.
#[derive(Debug)]
pub struct LiveGame {
    id: GameId,
    room: Mutex<GameRoom>,
    hub: Hub<GamePlayEvent>,
}

/// Events to publish once a stream has closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Gameplay event for the game's hub.
    pub event: GamePlayEvent,
    /// Lobby event, when a player left.
    pub status: Option<GameStatusEvent>,
}

/// One open stream on a game.
///
/// Dropping it unregisters the listener. When it was the viewer's last
/// stream, the viewer is marked disconnected and the leave is announced.
pub struct StreamRegistration {
    state: AppState,
    game: Arc<LiveGame>,
    viewer: ParticipantId,
    listener: ListenerId,
}

impl StreamRegistration {
    /// Game the stream watches.
    pub fn game(&self) -> &Arc<LiveGame> {
        &self.game
    }

    /// Viewer identity.
    pub fn viewer(&self) -> &ParticipantId {
        &self.viewer
    }
}

impl std::fmt::Debug for StreamRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistration")
            .field("game_id", &self.game.id())
            .field("viewer", &self.viewer)
            .field("listener", &self.listener)
            .finish()
    }
}

impl Drop for StreamRegistration {
    fn drop(&mut self) {
        let Some(departure) = self.game.close_stream(&self.viewer, self.listener) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(game_id = %self.game.id(), viewer = %self.viewer, "No runtime to announce departure");
            return;
        };
        let state = self.state.clone();
        let game = Arc::clone(&self.game);
        runtime.spawn(async move {
            state.publish_departure(&game, departure).await;
        });
    }
}

impl LiveGame {
    fn new(id: GameId, config: &ServerConfig) -> Self {
        Self {
            id,
            room: Mutex::new(GameRoom {
                game: Game::new(id),
                connections: ConnectionRegistry::new(),
            }),
            hub: Hub::spawn(
                format!("game-{id}"),
                *config.event_queue_capacity(),
                *config.listener_queue_capacity(),
            ),
        }
    }

    /// Game id.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Gameplay hub.
    pub fn hub(&self) -> &Hub<GamePlayEvent> {
        &self.hub
    }

    /// Locks the room, recovering from poisoning.
    pub fn lock(&self) -> MutexGuard<'_, GameRoom> {
        self.room.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the game under the room lock.
    pub fn with_game<R>(&self, f: impl FnOnce(&Game) -> R) -> R {
        f(&self.lock().game)
    }

    /// Releases one stream of `participant`.
    ///
    /// Returns the events to publish when this was the participant's last
    /// open stream.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn close_stream(&self, participant: &ParticipantId, listener: ListenerId) -> Option<Departure> {
        self.hub.unsubscribe(listener);

        let mut room = self.lock();
        if !room.connections.close(participant, listener) {
            debug!(
                %participant,
                remaining = room.connections.count(participant),
                viewers = room.connections.connected(),
                "Stream closed"
            );
            return None;
        }

        let left = room.game.disconnect(participant)?;
        let is_player = left.is_player();
        let info = format!("{} left", left.name());
        info!(%participant, is_player, "Participant disconnected");

        let kind = if is_player {
            GamePlayEventKind::PlayerLeft
        } else {
            GamePlayEventKind::SpectatorLeft
        };
        Some(Departure {
            event: GamePlayEvent::new(self.id, info.clone(), kind),
            status: is_player.then(|| GameStatusEvent::new(self.id, info)),
        })
    }
}

#[derive(Debug, Default)]
struct GameTable {
    last_id: u32,
    games: BTreeMap<GameId, Arc<LiveGame>>,
}

struct Inner {
    config: ServerConfig,
    games: Mutex<GameTable>,
    lobby: Hub<GameStatusEvent>,
}

/// Handle shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("lobby", &self.inner.lobby)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates the state and starts the lobby hub. Needs a Tokio runtime.
    #[instrument(skip(config))]
    pub fn new(config: ServerConfig) -> Self {
        let lobby = Hub::spawn(
            "lobby",
            *config.event_queue_capacity(),
            *config.listener_queue_capacity(),
        );
        info!("Application state initialized");
        Self {
            inner: Arc::new(Inner {
                config,
                games: Mutex::new(GameTable::default()),
                lobby,
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Lobby hub.
    pub fn lobby(&self) -> &Hub<GameStatusEvent> {
        &self.inner.lobby
    }

    fn table(&self) -> MutexGuard<'_, GameTable> {
        self.inner.games.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a game with the next sequential id.
    #[instrument(skip(self))]
    pub async fn create_game(&self) -> Result<Arc<LiveGame>, ApiError> {
        let game = {
            let mut table = self.table();
            table.last_id += 1;
            let id = GameId::new(table.last_id);
            let game = Arc::new(LiveGame::new(id, &self.inner.config));
            table.games.insert(id, Arc::clone(&game));
            game
        };
        info!(game_id = %game.id(), "Game created");

        self.lobby()
            .publish(GameStatusEvent::new(game.id(), "New game created".to_string()))
            .await?;
        Ok(game)
    }

    /// Looks up a game.
    pub fn game(&self, id: GameId) -> Result<Arc<LiveGame>, GameError> {
        self.table()
            .games
            .get(&id)
            .cloned()
            .ok_or_else(|| GameError::GameNotFound(id.to_string()))
    }

    /// Looks up a game by its textual id.
    pub fn find_game(&self, raw: &str) -> Result<Arc<LiveGame>, GameError> {
        self.game(raw.parse()?)
    }

    /// Every game, in id order.
    pub fn games(&self) -> Vec<Arc<LiveGame>> {
        self.table().games.values().cloned().collect()
    }

    /// Listing rows, in id order.
    pub fn summaries(&self) -> Vec<GameSummary> {
        self.games()
            .iter()
            .map(|game| game.with_game(GameSummary::of))
            .collect()
    }

    /// Adds `client` to a game without opening a stream.
    ///
    /// Without an open stream the participant is listed as disconnected.
    #[instrument(skip(self, game, name), fields(game_id = %game.id()))]
    pub async fn join(
        &self,
        game: &LiveGame,
        client: &ParticipantId,
        name: &str,
    ) -> Result<JoinOutcome, ApiError> {
        let outcome = {
            let mut room = game.lock();
            let outcome = room.game.join(client.clone(), name);
            if room.connections.count(client) == 0 {
                room.game.disconnect(client);
            }
            outcome
        };
        self.announce_join(game, name, outcome).await?;
        Ok(outcome)
    }

    /// Joins `client` and registers a listener on the game's hub.
    ///
    /// The listener is registered before the join event is published, so
    /// the new stream sees its own arrival. The returned [`StreamRegistration`]
    /// exists before the first await: dropping this future at any point
    /// releases the listener again.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn open_stream(
        &self,
        game: &Arc<LiveGame>,
        client: &ParticipantId,
    ) -> Result<(JoinOutcome, Subscription<GamePlayEvent>, StreamRegistration), ApiError> {
        let (outcome, subscription, registration, name) = {
            let mut room = game.lock();
            let outcome = room.game.join(client.clone(), client.as_str());
            let subscription = game.hub().subscribe();
            room.connections.open(client.clone(), subscription.id());
            let registration = StreamRegistration {
                state: self.clone(),
                game: Arc::clone(game),
                viewer: client.clone(),
                listener: subscription.id(),
            };
            let name = room
                .game
                .participants()
                .get(client)
                .map_or_else(|| client.to_string(), |p| p.name().to_string());
            (outcome, subscription, registration, name)
        };
        debug!(%client, listener = %subscription.id(), role = outcome.role(), "Stream opened");

        self.announce_join(game, &name, outcome).await?;
        Ok((outcome, subscription, registration))
    }

    async fn announce_join(
        &self,
        game: &LiveGame,
        name: &str,
        outcome: JoinOutcome,
    ) -> Result<(), ApiError> {
        let (kind, info) = if outcome.is_player() {
            (GamePlayEventKind::PlayerJoined, format!("{name} joined as {}", outcome.role()))
        } else {
            (GamePlayEventKind::SpectatorJoined, format!("{name} is watching"))
        };
        game.hub()
            .publish(GamePlayEvent::new(game.id(), info.clone(), kind))
            .await?;

        if matches!(outcome, JoinOutcome::Player(_)) {
            self.lobby()
                .publish(GameStatusEvent::new(game.id(), info))
                .await?;
        }
        Ok(())
    }

    /// Plays `client`'s mark at `cell`.
    ///
    /// # Errors
    ///
    /// [`GameError::NotStarted`] before two players joined,
    /// [`GameError::ForbiddenMover`] if `client` holds no player slot, and
    /// every rule violation from [`Game::play_move`].
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn play(
        &self,
        game: &LiveGame,
        client: &ParticipantId,
        cell: usize,
    ) -> Result<MoveOutcome, ApiError> {
        let (outcome, played, info) = {
            let mut room = game.lock();
            if !room.game.started() {
                return Err(GameError::NotStarted.into());
            }
            let slot = room.game.slot_of(client).ok_or(GameError::ForbiddenMover)?;
            let outcome = room.game.play_move(slot, cell)?;
            let played = room.game.last_move()?;
            (outcome, played, room.game.info())
        };

        match played {
            Some(played) => {
                game.hub()
                    .publish(GamePlayEvent::new(
                        game.id(),
                        format!("{} played cell {}", played.player, played.cell),
                        GamePlayEventKind::MovePlayed(played),
                    ))
                    .await?;
            }
            None => warn!(cell, "Accepted move left no history"),
        }

        if outcome.is_terminal() {
            game.hub()
                .publish(GamePlayEvent::new(
                    game.id(),
                    info.clone(),
                    GamePlayEventKind::GameOver,
                ))
                .await?;
            self.lobby()
                .publish(GameStatusEvent::new(game.id(), info))
                .await?;
        }
        Ok(outcome)
    }

    /// Publishes the events produced by [`LiveGame::close_stream`].
    pub async fn publish_departure(&self, game: &LiveGame, departure: Departure) {
        if let Err(e) = game.hub().publish(departure.event).await {
            warn!(game_id = %game.id(), error = %e, "Could not announce departure");
        }
        if let Some(status) = departure.status
            && let Err(e) = self.lobby().publish(status).await
        {
            warn!(game_id = %game.id(), error = %e, "Could not update lobby");
        }
    }

    /// Creates a finished game: two players, one spectator, and a top-row
    /// win for player one.
    #[instrument(skip(self))]
    pub async fn seed_demo_game(&self) -> Result<GameId, ApiError> {
        let game = self.create_game().await?;
        let players = [("t1", "Testing 1"), ("t2", "Testing 2"), ("t3", "Testing 3")];
        for (id, name) in players {
            self.join(&game, &ParticipantId::from(id), name).await?;
        }
        for (mover, cell) in [("t1", 0), ("t2", 3), ("t1", 1), ("t2", 4), ("t1", 2)] {
            self.play(&game, &ParticipantId::from(mover), cell).await?;
        }
        info!(game_id = %game.id(), "Demo game seeded");
        Ok(game.id())
    }
}
