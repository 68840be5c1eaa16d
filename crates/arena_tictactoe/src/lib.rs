//! Board engine for the authoritative tic-tac-toe match server.
//!
//! Everything in this crate is pure: boards are values, rules are
//! functions over them, and nothing here performs I/O. The match server
//! builds its state machine on top of these primitives.
//!
//! # Example
//!
//! ```
//! use arena_tictactoe::{Board, Mark, check_win, place_mark};
//!
//! # fn main() -> Result<(), arena_tictactoe::PlaceError> {
//! let board = place_mark(&Board::new(), 0, Mark::X)?;
//! let board = place_mark(&board, 4, Mark::X)?;
//! let board = place_mark(&board, 8, Mark::X)?;
//! assert!(check_win(&board, Mark::X));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod outcome;
mod rules;
mod types;

pub use error::{BoardParseError, PlaceError};
pub use outcome::Outcome;
pub use rules::{LINES, check_win, is_full, place_mark, winner};
pub use types::{BOARD_CELLS, Board, Cell, Mark};
