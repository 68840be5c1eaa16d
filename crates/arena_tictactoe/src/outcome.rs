//! Match outcome classification.

use crate::Mark;
use serde::{Deserialize, Serialize};

/// Where a match stands. Every variant except `InProgress` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// Still being played.
    #[default]
    InProgress,
    /// Won by the given mark, either on the board or by timeout.
    Won(Mark),
    /// Board filled with no line.
    Draw,
}

impl Outcome {
    /// True for every outcome other than `InProgress`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }

    /// The winning mark, if any.
    pub fn winner(self) -> Option<Mark> {
        match self {
            Outcome::Won(mark) => Some(mark),
            _ => None,
        }
    }

    /// Wire code: empty while in progress, `.` for a draw, else the mark.
    pub fn code(self) -> &'static str {
        match self {
            Outcome::InProgress => "",
            Outcome::Draw => ".",
            Outcome::Won(Mark::X) => "X",
            Outcome::Won(Mark::O) => "O",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::InProgress => write!(f, "In progress"),
            Outcome::Won(mark) => write!(f, "{} wins", mark),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}
