//! Game rules for tic-tac-toe.
//!
//! Pure functions over [`Board`] values. Placement returns a new board
//! and never mutates its input.

mod draw;
mod win;

pub use draw::is_full;
pub use win::{LINES, check_win, winner};

use crate::{BOARD_CELLS, Board, Mark, PlaceError};
use tracing::instrument;

/// Places `mark` at `index`, returning the resulting board.
///
/// Indices arrive straight from client payloads, so they are signed here
/// and checked before any conversion.
///
/// # Errors
///
/// [`PlaceError::OutOfRange`] when `index` is outside 0..=8 and
/// [`PlaceError::Occupied`] when the cell already holds a mark.
#[instrument(skip(board), fields(board = %board))]
pub fn place_mark(board: &Board, index: i64, mark: Mark) -> Result<Board, PlaceError> {
    let cell = usize::try_from(index)
        .ok()
        .filter(|i| *i < BOARD_CELLS)
        .ok_or(PlaceError::OutOfRange(index))?;

    if !board.is_empty(cell) {
        return Err(PlaceError::Occupied(cell));
    }

    Ok(board.with(cell, mark))
}
