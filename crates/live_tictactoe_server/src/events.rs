//! Events carried by the fan-out hubs.

use live_tictactoe::{GameId, PlayedMove};

/// Kind of gameplay event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum GamePlayEventKind {
    /// Malformed event; logged and otherwise ignored.
    Invalid,
    /// A player opened a stream.
    PlayerJoined,
    /// A player's last stream closed.
    PlayerLeft,
    /// A spectator opened a stream.
    SpectatorJoined,
    /// A spectator's last stream closed.
    SpectatorLeft,
    /// A move was accepted.
    MovePlayed(PlayedMove),
    /// The game reached a terminal state.
    GameOver,
}

impl GamePlayEventKind {
    /// Whether the participant list changed.
    pub fn affects_participants(&self) -> bool {
        matches!(
            self,
            GamePlayEventKind::PlayerJoined
                | GamePlayEventKind::PlayerLeft
                | GamePlayEventKind::SpectatorJoined
                | GamePlayEventKind::SpectatorLeft
        )
    }
}

/// Event on a game's gameplay hub.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct GamePlayEvent {
    /// Game the event belongs to.
    pub game_id: GameId,
    /// Free-text description, for logs.
    pub info: String,
    /// What happened.
    pub kind: GamePlayEventKind,
}

/// Event on the lobby hub.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct GameStatusEvent {
    /// Game whose status changed.
    pub game_id: GameId,
    /// Free-text description, for logs.
    pub info: String,
}
