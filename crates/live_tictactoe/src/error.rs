//! Game errors.

use crate::board::BoardError;
use derive_more::Display;

/// Reasons a game operation can be rejected.
///
/// None of these are fatal: each is reported back to the requester and the
/// game is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GameError {
    /// No game exists with the requested id.
    #[display("Game {_0} not found")]
    GameNotFound(String),

    /// The game already has a winner or a full board.
    #[display("Game has already ended")]
    GameAlreadyEnded,

    /// Fewer than two players have joined.
    #[display("Game has not started yet")]
    NotStarted,

    /// The target cell already holds a mark.
    #[display("Cell {_0} is already occupied")]
    CellOccupied(usize),

    /// The mover is a player, but not the one whose turn it is.
    #[display("It is not your turn")]
    NotYourTurn,

    /// Every cell holds a mark.
    #[display("The board is full")]
    BoardFull,

    /// The mover is not one of the two registered players.
    #[display("You are not a player in this game")]
    ForbiddenMover,

    /// The cell index is outside 0..=8.
    #[display("Cell {_0} is out of range (0-8)")]
    InvalidCell(usize),

    /// The value does not fit the two-bit player encoding.
    #[display("Invalid player value {_0}")]
    InvalidPlayer(u8),

    /// History offset is positive or reaches past the first move.
    #[display("History offset {_0} is out of range")]
    InvalidHistoryOffset(i64),

    /// Current board and recorded history disagree.
    #[display("Board history is inconsistent: {_0}")]
    InconsistentHistory(String),
}

impl std::error::Error for GameError {}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::InvalidPlayer(player) => GameError::InvalidPlayer(player),
            BoardError::InvalidCell(index) => GameError::InvalidCell(index),
        }
    }
}
