//! Error types for board operations.

use derive_more::{Display, Error};

/// Why a mark could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum PlaceError {
    /// Index outside 0..=8.
    #[display("Cell index {} is out of range (must be 0-8)", _0)]
    OutOfRange(#[error(not(source))] i64),
    /// Target cell already holds a mark.
    #[display("Cell {} is already occupied", _0)]
    Occupied(#[error(not(source))] usize),
}

/// Failure to read a board back from its wire string.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardParseError {
    /// The string was not exactly nine characters.
    #[display("Board string must have 9 cells, got {}", _0)]
    WrongLength(#[error(not(source))] usize),
    /// A character other than `.`, `X` or `O`.
    #[display("Unknown cell character '{}'", _0)]
    UnknownCell(#[error(not(source))] char),
}
