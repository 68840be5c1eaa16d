//! Win detection logic for tic-tac-toe.

use crate::{Board, Cell, Mark};
use tracing::instrument;

/// The eight winning triples: rows, columns, diagonals.
pub const LINES: [[usize; 3]; 8] = [
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

/// True iff `mark` fills any of the eight lines.
#[instrument(skip(board), fields(board = %board))]
pub fn check_win(board: &Board, mark: Mark) -> bool {
    let target = Some(Cell::Marked(mark));
    LINES
        .iter()
        .any(|line| line.iter().all(|&i| board.get(i) == target))
}

/// The mark holding a complete line, if any.
pub fn winner(board: &Board) -> Option<Mark> {
    [Mark::X, Mark::O]
        .into_iter()
        .find(|mark| check_win(board, *mark))
}
