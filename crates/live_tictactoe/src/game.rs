//! Game state machine over a packed board.
//!
//! A game moves through three phases:
//!
//! - `NotStarted` - fewer than two players, no current player
//! - `InProgress` - two players, no winner, board not full
//! - `Over` - a winner, or a full board (draw)
//!
//! Every move is validated before the board is touched, and each accepted
//! move appends the previous board to the history.

use crate::board::{Board, CELL_COUNT, PlayerSlot};
use crate::error::GameError;
use crate::participant::{Participant, ParticipantId, Participants};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// Sequential game identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct GameId(u32);

impl GameId {
    /// Wraps a raw id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for GameId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(GameId)
            .map_err(|_| GameError::GameNotFound(s.to_string()))
    }
}

/// Lifecycle phase derived from the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum GamePhase {
    /// Waiting for a second player.
    NotStarted,
    /// Moves are being played.
    InProgress,
    /// Won or drawn.
    Over,
}

/// What a join did for the joining client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Took a free player slot.
    Player(PlayerSlot),
    /// Already held this slot; marked reconnected.
    ReturningPlayer(PlayerSlot),
    /// Both slots taken; added as a spectator.
    Spectator,
    /// Known spectator; marked reconnected.
    ReturningSpectator,
}

impl JoinOutcome {
    /// Slot held by the client, if it is a player.
    pub fn slot(self) -> Option<PlayerSlot> {
        match self {
            JoinOutcome::Player(slot) | JoinOutcome::ReturningPlayer(slot) => Some(slot),
            JoinOutcome::Spectator | JoinOutcome::ReturningSpectator => None,
        }
    }

    /// Whether the client is one of the two players.
    pub fn is_player(self) -> bool {
        self.slot().is_some()
    }

    /// Role name reported to clients.
    pub fn role(self) -> &'static str {
        match self.slot() {
            Some(PlayerSlot::One) => "player1",
            Some(PlayerSlot::Two) => "player2",
            None => "spectator",
        }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Game continues with `next` to move.
    Continue {
        /// Slot whose turn it is now.
        next: PlayerSlot,
    },
    /// The mover completed a line.
    Won(PlayerSlot),
    /// Board filled without a line.
    Draw,
}

impl MoveOutcome {
    /// True if the move ended the game.
    pub fn is_terminal(self) -> bool {
        !matches!(self, MoveOutcome::Continue { .. })
    }
}

/// A move reconstructed from the board history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_new::new)]
pub struct PlayedMove {
    /// Who moved.
    pub player: PlayerSlot,
    /// Where.
    pub cell: usize,
}

/// Rendering data for a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// `""`, `"X"` or `"O"`.
    pub symbol: &'static str,
    /// Board index 0..=8.
    pub index: usize,
    /// Owning game.
    pub game_id: GameId,
}

/// A tic-tac-toe game with its players, spectators and move history.
#[derive(Debug, Clone)]
pub struct Game {
    id: GameId,
    board: Board,
    player1: Option<ParticipantId>,
    player2: Option<ParticipantId>,
    current_player: Option<PlayerSlot>,
    winner: Option<PlayerSlot>,
    history: Vec<Board>,
    participants: Participants,
}

impl Game {
    /// Creates an empty game waiting for players.
    #[instrument]
    pub fn new(id: GameId) -> Self {
        debug!(game_id = %id, "Creating game");
        Self {
            id,
            board: Board::new(),
            player1: None,
            player2: None,
            current_player: None,
            winner: None,
            history: Vec::new(),
            participants: Participants::new(),
        }
    }

    /// Game id.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Boards before each move, oldest first.
    pub fn history(&self) -> &[Board] {
        &self.history
    }

    /// Everyone who has joined, in join order.
    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    /// Id holding the given slot.
    pub fn player(&self, slot: PlayerSlot) -> Option<&ParticipantId> {
        match slot {
            PlayerSlot::One => self.player1.as_ref(),
            PlayerSlot::Two => self.player2.as_ref(),
        }
    }

    /// Display name of the player in the given slot.
    pub fn player_name(&self, slot: PlayerSlot) -> Option<&str> {
        self.player(slot)
            .and_then(|id| self.participants.get(id))
            .map(Participant::name)
    }

    /// Slot whose turn it is. `None` until two players joined.
    pub fn current_player(&self) -> Option<PlayerSlot> {
        self.current_player
    }

    /// Id of the player whose turn it is.
    pub fn current_player_id(&self) -> Option<&ParticipantId> {
        self.current_player.and_then(|slot| self.player(slot))
    }

    /// Winning slot, if any.
    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }

    /// Id of the winning player, if any.
    pub fn winner_id(&self) -> Option<&ParticipantId> {
        self.winner.and_then(|slot| self.player(slot))
    }

    /// Both players have joined.
    pub fn started(&self) -> bool {
        self.current_player.is_some()
    }

    /// A winner exists or the board is full.
    pub fn game_over(&self) -> bool {
        self.winner.is_some() || self.board.is_full()
    }

    /// Full board, no winner.
    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && self.board.is_full()
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        if self.game_over() {
            GamePhase::Over
        } else if self.started() {
            GamePhase::InProgress
        } else {
            GamePhase::NotStarted
        }
    }

    /// Slot held by `id`, if it is a player.
    pub fn slot_of(&self, id: &ParticipantId) -> Option<PlayerSlot> {
        if self.player1.as_ref() == Some(id) {
            Some(PlayerSlot::One)
        } else if self.player2.as_ref() == Some(id) {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }

    /// Adds a client to the game.
    ///
    /// The first two distinct ids take the player slots; the second join
    /// starts the game with player one to move. Later ids become spectators.
    /// Known ids are only marked reconnected.
    #[instrument(skip(self, name), fields(game_id = %self.id))]
    pub fn join(&mut self, id: ParticipantId, name: impl Into<String>) -> JoinOutcome {
        if let Some(slot) = self.slot_of(&id) {
            self.participants.set_connected(&id, true);
            debug!(participant = %id, %slot, "Player reconnected");
            return JoinOutcome::ReturningPlayer(slot);
        }

        if self.player1.is_none() {
            self.participants.add(Participant::new(id.clone(), name.into(), true));
            info!(participant = %id, "Player 1 joined");
            self.player1 = Some(id);
            return JoinOutcome::Player(PlayerSlot::One);
        }

        if self.player2.is_none() {
            self.participants.add(Participant::new(id.clone(), name.into(), true));
            info!(participant = %id, "Player 2 joined, game started");
            self.player2 = Some(id);
            self.current_player = Some(PlayerSlot::One);
            return JoinOutcome::Player(PlayerSlot::Two);
        }

        if self.participants.contains(&id) {
            self.participants.set_connected(&id, true);
            debug!(participant = %id, "Spectator reconnected");
            return JoinOutcome::ReturningSpectator;
        }

        self.participants.add(Participant::new(id.clone(), name.into(), false));
        debug!(participant = %id, "Spectator joined");
        JoinOutcome::Spectator
    }

    /// Marks a participant as having no open connection.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn disconnect(&mut self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.set_connected(id, false)
    }

    /// Plays `slot`'s mark at `cell`.
    ///
    /// # Errors
    ///
    /// Checked in order: [`GameError::GameAlreadyEnded`], [`GameError::NotStarted`],
    /// [`GameError::InvalidCell`], [`GameError::CellOccupied`],
    /// [`GameError::NotYourTurn`], [`GameError::BoardFull`]. The board is only
    /// written once every check has passed.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn play_move(&mut self, slot: PlayerSlot, cell: usize) -> Result<MoveOutcome, GameError> {
        if self.game_over() {
            warn!("Move after game over");
            return Err(GameError::GameAlreadyEnded);
        }
        let Some(current) = self.current_player else {
            return Err(GameError::NotStarted);
        };
        if cell >= CELL_COUNT {
            return Err(GameError::InvalidCell(cell));
        }
        if !self.board.is_empty(cell) {
            return Err(GameError::CellOccupied(cell));
        }
        if slot != current {
            warn!(expected = %current, "Move out of turn");
            return Err(GameError::NotYourTurn);
        }
        if self.board.is_full() {
            return Err(GameError::BoardFull);
        }

        let mut next = self.board;
        next.set_cell(cell, slot.bits())?;
        self.history.push(self.board);
        self.board = next;

        let outcome = if self.check_winner().is_some() {
            self.winner = Some(current);
            MoveOutcome::Won(current)
        } else if self.board.is_full() {
            MoveOutcome::Draw
        } else {
            let next = current.other();
            self.current_player = Some(next);
            MoveOutcome::Continue { next }
        };

        info!(
            cell,
            player = %slot,
            moves = self.history.len(),
            outcome = ?outcome,
            "Move played"
        );
        Ok(outcome)
    }

    /// Slot owning a complete row, column or diagonal.
    pub fn check_winner(&self) -> Option<PlayerSlot> {
        self.board.winner()
    }

    /// Reconstructs the most recent move from the board history.
    ///
    /// Returns `Ok(None)` before the first move. Exactly one cell may differ
    /// between the current board and the last snapshot; anything else is
    /// reported as [`GameError::InconsistentHistory`].
    pub fn last_move(&self) -> Result<Option<PlayedMove>, GameError> {
        let Some(previous) = self.history.last() else {
            return Ok(None);
        };

        let diff = self.board.value() ^ previous.value();
        if diff == 0 {
            return Err(GameError::InconsistentHistory(
                "board unchanged since last snapshot".to_string(),
            ));
        }

        let cell = (diff.trailing_zeros() / 2) as usize;
        if diff >> (cell * 2) > 0b11 {
            return Err(GameError::InconsistentHistory(format!(
                "more than one cell changed ({:018b})",
                diff
            )));
        }

        let player = PlayerSlot::from_bits(self.board.get_cell(cell)).ok_or_else(|| {
            GameError::InconsistentHistory(format!("cell {cell} holds no player"))
        })?;

        Ok(Some(PlayedMove::new(player, cell)))
    }

    /// Rendering data for one cell.
    pub fn cell(&self, index: usize) -> Result<Cell, GameError> {
        if index >= CELL_COUNT {
            return Err(GameError::InvalidCell(index));
        }
        Ok(Cell {
            symbol: self.board.symbol(index),
            index,
            game_id: self.id,
        })
    }

    /// Rendering data for every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..CELL_COUNT).map(|index| Cell {
            symbol: self.board.symbol(index),
            index,
            game_id: self.id,
        })
    }

    /// One-line summary for game listings.
    pub fn info(&self) -> String {
        if let Some(slot) = self.winner {
            return format!("Player {} wins!", self.player_name(slot).unwrap_or(slot.label()));
        }
        if self.is_draw() {
            return "Draw!".to_string();
        }
        match (self.player_name(PlayerSlot::One), self.player_name(PlayerSlot::Two)) {
            (None, _) => "Waiting for players".to_string(),
            (Some(_), None) => "Waiting for player 2".to_string(),
            (Some(one), Some(two)) => format!("Playing {one} vs {two}"),
        }
    }

    /// One-line status shown on the game page.
    pub fn play_status(&self) -> String {
        if let Some(slot) = self.winner {
            return format!(
                "Game over! {} wins!",
                self.player_name(slot).unwrap_or(slot.label())
            );
        }
        if self.is_draw() {
            return "Game over! It's a draw.".to_string();
        }
        match self.current_player {
            Some(slot) => format!("Current player: {}", slot.label()),
            None if self.player1.is_none() => "Waiting for players".to_string(),
            None => "Waiting for player 2".to_string(),
        }
    }
}
