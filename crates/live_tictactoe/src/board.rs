//! Packed tic-tac-toe board.
//!
//! The whole 3x3 grid lives in a single integer. Each cell takes two bits:
//! `00` is empty, `01` belongs to player one and `10` to player two. The
//! pattern `11` is never written; it only shows up as `"?"` if a board is
//! built from raw bits that violate the encoding.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

const CELL_MASK: u32 = 0b11;

/// The eight winning triples: three rows, three columns, two diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// One of the two player slots in a game.
///
/// The slot doubles as the two-bit pattern its marks occupy on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    /// First player to join. Plays `X` and moves first.
    #[strum(serialize = "player1")]
    One,
    /// Second player to join. Plays `O`.
    #[strum(serialize = "player2")]
    Two,
}

impl PlayerSlot {
    /// Cell encoding used for this slot's marks.
    pub const fn bits(self) -> u8 {
        match self {
            PlayerSlot::One => 0b01,
            PlayerSlot::Two => 0b10,
        }
    }

    /// Decodes a cell value. Empty (`00`) and invalid (`11`) cells yield `None`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b01 => Some(PlayerSlot::One),
            0b10 => Some(PlayerSlot::Two),
            _ => None,
        }
    }

    /// The opponent slot.
    pub const fn other(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    /// Mark drawn for this slot.
    pub const fn symbol(self) -> &'static str {
        match self {
            PlayerSlot::One => "X",
            PlayerSlot::Two => "O",
        }
    }

    /// Human-facing label ("Player 1" / "Player 2").
    pub const fn label(self) -> &'static str {
        match self {
            PlayerSlot::One => "Player 1",
            PlayerSlot::Two => "Player 2",
        }
    }
}

/// Rejected board write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BoardError {
    /// The value does not fit the two-bit player encoding.
    #[display("Invalid player value {_0}")]
    InvalidPlayer(u8),
    /// The index is outside 0..=8.
    #[display("Cell {_0} is out of range (0-8)")]
    InvalidCell(usize),
}

impl std::error::Error for BoardError {}

/// 3x3 board packed two bits per cell, row-major.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    value: u32,
}

impl Board {
    /// Creates an empty board.
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Wraps a raw packed value without validation.
    pub const fn from_bits(value: u32) -> Self {
        Self { value }
    }

    /// Raw packed value.
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Merges `player` into the cell at `index`.
    ///
    /// The write is an OR: it never clears a cell, so callers must only
    /// target empty cells. `Game::play_move` checks that before calling.
    #[instrument(level = "trace", skip(self), fields(board = self.value))]
    pub fn set_cell(&mut self, index: usize, player: u8) -> Result<(), BoardError> {
        if player > PlayerSlot::Two.bits() {
            return Err(BoardError::InvalidPlayer(player));
        }
        if index >= CELL_COUNT {
            return Err(BoardError::InvalidCell(index));
        }

        self.value |= u32::from(player) << (index * 2);
        Ok(())
    }

    /// Two-bit value at `index`. Indices past the board read as empty.
    pub fn get_cell(&self, index: usize) -> u8 {
        let shift = u32::try_from(index.saturating_mul(2)).unwrap_or(u32::MAX);
        let cell = self.value.checked_shr(shift).unwrap_or(0) & CELL_MASK;
        // Masked to two bits, always fits.
        cell as u8
    }

    /// Whether the cell at `index` holds no mark.
    pub fn is_empty(&self, index: usize) -> bool {
        self.get_cell(index) == 0
    }

    /// Rendering of the cell: `""`, `"X"`, `"O"`, or `"?"` for the invalid `11`.
    pub fn symbol(&self, index: usize) -> &'static str {
        match self.get_cell(index) {
            0b00 => "",
            0b01 => "X",
            0b10 => "O",
            _ => "?",
        }
    }

    /// True once every cell holds a mark.
    pub fn is_full(&self) -> bool {
        (0..CELL_COUNT).all(|index| !self.is_empty(index))
    }

    /// Player owning a complete line, if any.
    ///
    /// A line wins when the AND of its three cells is `01` or `10`.
    pub fn winner(&self) -> Option<PlayerSlot> {
        WINNING_LINES.iter().find_map(|&[a, b, c]| {
            PlayerSlot::from_bits(self.get_cell(a) & self.get_cell(b) & self.get_cell(c))
        })
    }

    /// Binary form of the packed value, 18 digits wide.
    pub fn bits(&self) -> String {
        format!("{:018b}", self.value)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                let symbol = self.symbol(row * 3 + col);
                f.write_str(if symbol.is_empty() { "-" } else { symbol })?;
            }
            writeln!(f)?;
        }
        write!(f, "\n{}", self.bits())
    }
}
