//! SQLite persistence for players, matches and leaderboards.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::{DbError, DbErrorKind};
pub use models::{
    DailyLeaderboardRecord, LeaderboardRecord, MatchParticipantRecord, MatchRecord,
    NewParticipant, ParticipantRating, PlayerRecord, Standing,
};
pub use repository::{GameRepository, MIGRATIONS};
