//! Database models and domain types.

use chrono::{NaiveDate, NaiveDateTime};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::schema;

/// Player profile keyed by the identity issued by the session layer.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Getters, new)]
#[diesel(table_name = schema::players)]
pub struct PlayerRecord {
    id: i32,
    external_id: String,
    nickname: String,
    rating: i32,
    created_at: NaiveDateTime,
}

/// Insertable player for the upsert-by-identity statement.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::players)]
pub(crate) struct NewPlayer {
    external_id: String,
    nickname: String,
    rating: i32,
}

/// Persisted match row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::matches)]
pub struct MatchRecord {
    id: i32,
    mode: String,
    state_snapshot: String,
    winner_player_id: Option<i32>,
    started_at: NaiveDateTime,
    ended_at: Option<NaiveDateTime>,
}

/// Insertable match row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::matches)]
pub(crate) struct NewMatch {
    mode: String,
    state_snapshot: String,
}

/// Per-participant row of a persisted match.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::match_players)]
pub struct MatchParticipantRecord {
    match_id: i32,
    player_id: i32,
    symbol: String,
    rating_before: i32,
    rating_after: Option<i32>,
}

/// Insertable participant row, capturing the rating at join time.
#[derive(Debug, Clone, PartialEq, Insertable, new, Getters)]
#[diesel(table_name = schema::match_players)]
pub struct NewParticipant {
    match_id: i32,
    player_id: i32,
    symbol: String,
    rating_before: i32,
}

/// A participant as seen by settlement: store key, identity and starting rating.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Getters, new)]
pub struct ParticipantRating {
    player_id: i32,
    external_id: String,
    symbol: String,
    rating_before: i32,
}

/// All-time leaderboard row.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::leaderboard_alltime)]
pub struct LeaderboardRecord {
    player_id: i32,
    wins: i32,
    losses: i32,
    rating: i32,
}

#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::leaderboard_alltime)]
pub(crate) struct NewLeaderboardEntry {
    player_id: i32,
    wins: i32,
    losses: i32,
    rating: i32,
}

/// Daily leaderboard row.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::leaderboard_daily)]
pub struct DailyLeaderboardRecord {
    player_id: i32,
    period: NaiveDate,
    wins: i32,
    losses: i32,
    rating: i32,
}

#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::leaderboard_daily)]
pub(crate) struct NewDailyEntry {
    player_id: i32,
    period: NaiveDate,
    wins: i32,
    losses: i32,
    rating: i32,
}

/// Result of a decided match from one player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standing {
    /// Player won.
    Win,
    /// Player lost.
    Loss,
}

impl Standing {
    /// Win/loss counter increments for this standing.
    #[instrument]
    pub fn increments(self) -> (i32, i32) {
        match self {
            Self::Win => (1, 0),
            Self::Loss => (0, 1),
        }
    }
}
