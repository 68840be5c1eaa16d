//! One-time post-game rating and leaderboard settlement.
//!
//! Settlement reads only the final board, outcome, mark assignment and the
//! persisted participant rows. Every write is attempted on its own: a failed
//! step is logged and reported, never rolled back, and never blocks the
//! steps after it.

use std::collections::HashMap;
use std::sync::Arc;

use arena_tictactoe::{Board, Mark, Outcome};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, ParticipantRating, Standing};
use crate::messages::Snapshot;
use crate::presence::UserId;
use crate::rating;
use crate::store::MatchStore;

/// Everything settlement needs from a finished match.
#[derive(Debug, Clone, Getters, new)]
pub struct SettlementInput {
    match_id: Option<i32>,
    board: Board,
    turn: Mark,
    outcome: Outcome,
    symbol_of: HashMap<UserId, Mark>,
    ended_at: DateTime<Utc>,
}

/// A settlement write that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SettlementStep {
    /// Player rating update.
    #[display("player rating")]
    PlayerRating,
    /// Participant `rating_after` update.
    #[display("participant rating")]
    RatingAfter,
    /// Match end state, snapshot and winner.
    #[display("match end state")]
    MatchEnd,
    /// All-time leaderboard upsert.
    #[display("all-time leaderboard")]
    AlltimeLeaderboard,
    /// Daily leaderboard upsert.
    #[display("daily leaderboard")]
    DailyLeaderboard,
}

/// Rating movement for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct RatingChange {
    player_id: i32,
    before: i32,
    after: i32,
}

/// What a settlement run did.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
pub struct SettlementReport {
    match_id: Option<i32>,
    winner_player_id: Option<i32>,
    rating_changes: Vec<RatingChange>,
    failed_steps: Vec<SettlementStep>,
}

impl SettlementReport {
    /// True when there was no persisted row and nothing was written.
    pub fn skipped(&self) -> bool {
        self.match_id.is_none()
    }

    /// True when every attempted write succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

/// Settlement could not run at all; the caller should retry later.
#[derive(Debug, Clone, Display, Error)]
#[display("Settlement error: {} at {}:{}", message, file, line)]
pub struct SettlementError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SettlementError {
    /// Creates a new settlement error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<DbError> for SettlementError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        Self::new(format!("Could not load participants: {}", err))
    }
}

/// Computes Elo changes and writes end-of-match records.
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn MatchStore>,
    k_factor: f64,
}

impl std::fmt::Debug for SettlementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementService")
            .field("k_factor", &self.k_factor)
            .finish_non_exhaustive()
    }
}

impl SettlementService {
    /// Creates a settlement service writing to `store`.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn MatchStore>, k_factor: f64) -> Self {
        Self { store, k_factor }
    }

    /// Settles a decided match.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError`] when the match is not decided or its
    /// participant rows cannot be read. Nothing has been written in either
    /// case, so the call can be repeated.
    #[instrument(skip(self, input), fields(match_id = ?input.match_id, outcome = %input.outcome))]
    pub fn settle(&self, input: &SettlementInput) -> Result<SettlementReport, SettlementError> {
        if !input.outcome.is_terminal() {
            return Err(SettlementError::new("Match is still in progress"));
        }

        let Some(match_id) = input.match_id else {
            info!("Match was never persisted, nothing to settle");
            return Ok(SettlementReport::default());
        };

        let participants = self.store.participants(match_id)?;
        let mut report = SettlementReport {
            match_id: Some(match_id),
            ..SettlementReport::default()
        };

        let winner = winner_row(input, &participants);
        report.winner_player_id = winner.map(|w| *w.player_id());

        let mut ratings: HashMap<i32, i32> = participants
            .iter()
            .map(|p| (*p.player_id(), *p.rating_before()))
            .collect();

        if participants.len() == 2
            && let Some(winner) = winner
            && let Some(loser) = participants.iter().find(|p| p.player_id() != winner.player_id())
        {
            let (winner_after, loser_after) =
                rating::elo_update(*winner.rating_before(), *loser.rating_before(), self.k_factor);

            for (row, after) in [(winner, winner_after), (loser, loser_after)] {
                let player_id = *row.player_id();
                attempt(
                    &mut report,
                    SettlementStep::PlayerRating,
                    self.store.update_player_rating(player_id, after),
                );
                attempt(
                    &mut report,
                    SettlementStep::RatingAfter,
                    self.store.set_rating_after(match_id, player_id, after),
                );
                ratings.insert(player_id, after);
                report
                    .rating_changes
                    .push(RatingChange::new(player_id, *row.rating_before(), after));
            }
            debug!(winner_after, loser_after, "Ratings updated");
        } else {
            debug!(participants = participants.len(), "No rating change");
        }

        let snapshot = Snapshot::closing(&input.board, input.turn, input.outcome).to_json();
        let finished = self.store.finish_match(
            match_id,
            &snapshot,
            report.winner_player_id,
            input.ended_at.naive_utc(),
        );
        attempt(&mut report, SettlementStep::MatchEnd, finished);

        // Draws leave win/loss counters alone.
        if let Some(winner) = winner {
            for p in &participants {
                let standing = if p.player_id() == winner.player_id() {
                    Standing::Win
                } else {
                    Standing::Loss
                };
                let rating = ratings.get(p.player_id()).copied().unwrap_or(*p.rating_before());
                attempt(
                    &mut report,
                    SettlementStep::AlltimeLeaderboard,
                    self.store.record_alltime(*p.player_id(), standing, rating),
                );
            }
        }

        let period = input.ended_at.date_naive();
        for p in &participants {
            let rating = ratings.get(p.player_id()).copied().unwrap_or(*p.rating_before());
            attempt(
                &mut report,
                SettlementStep::DailyLeaderboard,
                self.store.record_daily(*p.player_id(), period, rating),
            );
        }

        info!(
            winner_player_id = ?report.winner_player_id,
            changes = report.rating_changes.len(),
            failed = report.failed_steps.len(),
            "Match settled"
        );
        Ok(report)
    }
}

/// Participant row of the player holding the winning mark.
fn winner_row<'a>(
    input: &SettlementInput,
    participants: &'a [ParticipantRating],
) -> Option<&'a ParticipantRating> {
    let mark = input.outcome.winner()?;
    let (user_id, _) = input.symbol_of.iter().find(|(_, m)| **m == mark)?;
    participants.iter().find(|p| p.external_id() == user_id)
}

fn attempt(report: &mut SettlementReport, step: SettlementStep, result: Result<(), DbError>) {
    if let Err(e) = result {
        warn!(%step, error = %e, "Settlement step failed");
        report.failed_steps.push(step);
    }
}
