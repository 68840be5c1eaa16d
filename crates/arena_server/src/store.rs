//! Persistence port used by the lifecycle manager and settlement.
//!
//! One method per statement. Callers treat every failure as non-fatal:
//! the in-memory match stays authoritative even when durable records lag.

use chrono::{NaiveDate, NaiveDateTime};

use crate::db::{DbError, NewParticipant, ParticipantRating, PlayerRecord, Standing};

/// Statement-level access to the backing store.
///
/// Implementations must be safe to share between matches; upserts keyed on
/// player (and player plus period) give the idempotence concurrent
/// settlements rely on.
pub trait MatchStore: Send + Sync {
    /// Inserts the player or refreshes their nickname, returning the stored row.
    fn upsert_player(&self, external_id: &str, nickname: &str) -> Result<PlayerRecord, DbError>;

    /// Inserts a match row and returns its key.
    fn create_match(&self, mode: &str, snapshot: &str) -> Result<i32, DbError>;

    /// Inserts one participant row.
    fn add_participant(&self, participant: NewParticipant) -> Result<(), DbError>;

    /// Participant rows of a match with each player's identity.
    fn participants(&self, match_id: i32) -> Result<Vec<ParticipantRating>, DbError>;

    /// Overwrites a player's current rating.
    fn update_player_rating(&self, player_id: i32, rating: i32) -> Result<(), DbError>;

    /// Records the post-match rating on a participant row.
    fn set_rating_after(&self, match_id: i32, player_id: i32, rating: i32)
    -> Result<(), DbError>;

    /// Stores the final snapshot, end time and winner (none for a draw).
    fn finish_match(
        &self,
        match_id: i32,
        snapshot: &str,
        winner_player_id: Option<i32>,
        ended_at: NaiveDateTime,
    ) -> Result<(), DbError>;

    /// Upserts the all-time leaderboard row, bumping wins or losses.
    fn record_alltime(&self, player_id: i32, standing: Standing, rating: i32)
    -> Result<(), DbError>;

    /// Upserts the leaderboard row for `period`, refreshing only the rating.
    fn record_daily(&self, player_id: i32, period: NaiveDate, rating: i32) -> Result<(), DbError>;
}
