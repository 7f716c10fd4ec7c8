//! Browsing earlier boards of a game.
//!
//! Offsets count backwards from the live board: `0` is the current board,
//! `-1` the board before the last move, down to `-history.len()` (empty).

use crate::board::Board;
use crate::error::GameError;
use crate::game::{Game, GameId};
use serde::Serialize;

/// Navigation state for a history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryControls {
    /// Game being browsed.
    pub game_id: GameId,
    /// Offset being shown.
    pub offset: i64,
    /// Offset one move further back.
    pub back_offset: i64,
    /// Offset one move forward.
    pub forward_offset: i64,
    /// An earlier board exists.
    pub can_go_back: bool,
    /// A later board exists.
    pub can_go_forward: bool,
    /// Showing the live board.
    pub at_current: bool,
}

impl Game {
    /// Board at `offset` moves before the current one.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidHistoryOffset`] for positive offsets or offsets
    /// older than the first recorded board.
    pub fn board_at(&self, offset: i64) -> Result<Board, GameError> {
        let back = self.steps_back(offset)?;
        if back == 0 {
            return Ok(*self.board());
        }
        Ok(self.history()[self.history().len() - back])
    }

    /// Navigation controls for `offset`.
    pub fn history_controls(&self, offset: i64) -> Result<HistoryControls, GameError> {
        let back = self.steps_back(offset)?;
        Ok(HistoryControls {
            game_id: self.id(),
            offset,
            back_offset: offset - 1,
            forward_offset: offset + 1,
            can_go_back: back < self.history().len(),
            can_go_forward: offset < 0,
            at_current: offset == 0,
        })
    }

    fn steps_back(&self, offset: i64) -> Result<usize, GameError> {
        if offset > 0 {
            return Err(GameError::InvalidHistoryOffset(offset));
        }
        let back = usize::try_from(offset.unsigned_abs())
            .map_err(|_| GameError::InvalidHistoryOffset(offset))?;
        if back > self.history().len() {
            return Err(GameError::InvalidHistoryOffset(offset));
        }
        Ok(back)
    }
}
