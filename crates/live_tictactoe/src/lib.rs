//! Live tic-tac-toe game logic.
//!
//! Pure, synchronous building blocks for the live tic-tac-toe server:
//!
//! - **Board**: 9 cells packed two bits each into one integer
//! - **Game**: join/turn/win state machine with a board history
//! - **Participants**: players and spectators in join order
//!
//! # Example
//!
//! ```
//! use live_tictactoe::{Game, GameId, PlayerSlot};
//!
//! let mut game = Game::new(GameId::new(1));
//! game.join("alice".into(), "Alice");
//! game.join("bob".into(), "Bob");
//!
//! for (slot, cell) in [
//!     (PlayerSlot::One, 0),
//!     (PlayerSlot::Two, 3),
//!     (PlayerSlot::One, 1),
//!     (PlayerSlot::Two, 4),
//!     (PlayerSlot::One, 2),
//! ] {
//!     game.play_move(slot, cell).unwrap();
//! }
//! assert_eq!(game.winner(), Some(PlayerSlot::One));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod game;
mod history;
mod participant;

pub use board::{Board, BoardError, CELL_COUNT, PlayerSlot, WINNING_LINES};
pub use error::GameError;
pub use game::{Cell, Game, GameId, GamePhase, JoinOutcome, MoveOutcome, PlayedMove};
pub use history::HistoryControls;
pub use participant::{Participant, ParticipantId, Participants};
