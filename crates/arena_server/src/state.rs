//! Mutable state of one hosted match.

use arena_tictactoe::{Board, Mark, Outcome};
use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use tracing::instrument;

use crate::presence::Roster;

/// Authoritative state of one match.
///
/// Mutated only by the per-tick step and the join/leave handlers.
#[derive(Debug, Clone, Getters)]
pub struct MatchState {
    pub(crate) board: Board,
    pub(crate) turn: Mark,
    pub(crate) roster: Roster,
    pub(crate) turn_deadline: DateTime<Utc>,
    pub(crate) outcome: Outcome,
    pub(crate) mode: String,
    pub(crate) persisted_match_id: Option<i32>,
    pub(crate) row_creation_attempted: bool,
    pub(crate) settled: bool,
}

impl MatchState {
    /// Empty board, X to move, deadline one timeout from `now`.
    #[instrument(skip(mode))]
    pub fn new(mode: String, now: DateTime<Utc>, turn_timeout: Duration) -> Self {
        Self {
            board: Board::new(),
            turn: Mark::X,
            roster: Roster::new(),
            turn_deadline: deadline_after(now, turn_timeout),
            outcome: Outcome::InProgress,
            mode,
            persisted_match_id: None,
            row_creation_attempted: false,
            settled: false,
        }
    }

    /// Number of connected participants.
    pub fn participant_count(&self) -> usize {
        self.roster.len()
    }

    /// True once the outcome is decided.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }
}

/// `now + timeout`, saturating at the latest representable instant.
pub(crate) fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    now.checked_add_signed(timeout)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
