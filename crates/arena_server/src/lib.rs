//! Authoritative match server for two-player tic-tac-toe.
//!
//! The server is the single source of truth for board state, turn order,
//! win/draw detection, turn timeouts and rating updates. Clients only send
//! move intents.
//!
//! # Architecture
//!
//! - **State machine** ([`Match::tick`]): validates queued moves, advances
//!   turns, enforces the turn deadline, broadcasts every accepted move
//! - **Lifecycle** ([`Match::join_attempt`], [`Match::join`], [`Match::leave`]):
//!   admits at most two presences, assigns marks permanently, persists the
//!   match row once full
//! - **Settlement** ([`SettlementService`]): Elo update and leaderboard
//!   writes, run exactly once per decided match
//! - **Creation** ([`MatchParams`], [`params_from_pairing`]): turns a request
//!   or pairing event into a new match
//! - **Hosting** ([`MatchRegistry`]): queues messages per match and drives ticks
//!
//! Transport and storage are injected as [`Broadcaster`] and [`MatchStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arena_server::{GameRepository, MatchParams, MatchRegistry, ServerConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! let repo = GameRepository::new(config.db_path().clone())?;
//! repo.run_migrations()?;
//!
//! let registry = MatchRegistry::new(Arc::new(repo), config);
//! let handle = registry.create_match(&MatchParams::with_mode("ranked"), chrono::Utc::now())?;
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod broadcast;
mod config;
mod creation;
mod db;
mod lifecycle;
mod machine;
mod messages;
mod presence;
mod rating;
mod registry;
mod settlement;
mod state;
mod store;

// Crate-level exports - Capabilities
pub use broadcast::{BroadcastError, Broadcaster, ChannelBroadcaster, Outbound};
pub use store::MatchStore;

// Crate-level exports - Configuration
pub use config::{ConfigError, DB_PATH_ENV, MAX_TICK_RATE_HZ, ServerConfig};

// Crate-level exports - Persistence
pub use db::{
    DailyLeaderboardRecord, DbError, DbErrorKind, GameRepository, LeaderboardRecord, MIGRATIONS,
    MatchParticipantRecord, MatchRecord, NewParticipant, ParticipantRating, PlayerRecord,
    Standing,
};

// Crate-level exports - Match lifecycle and state machine
pub use creation::{
    DEFAULT_MODE, MODE_PROPERTY, MatchParams, MatchSettings, MatchmakerEntry, params_from_pairing,
};
pub use lifecycle::{JoinDecision, MATCH_FULL, MAX_PARTICIPANTS};
pub use machine::{Match, TickReport};
pub use messages::{MatchData, MoveMessage, OP_MOVE, Snapshot, StateUpdate};
pub use presence::{Presence, Roster, UserId};
pub use state::MatchState;

// Crate-level exports - Settlement
pub use rating::{DEFAULT_K_FACTOR, elo_update, expected_score, updated_rating};
pub use settlement::{
    RatingChange, SettlementError, SettlementInput, SettlementReport, SettlementService,
    SettlementStep,
};

// Crate-level exports - Hosting
pub use registry::{MatchRegistry, RegistryError};

// Board engine re-exports
pub use arena_tictactoe::{Board, Cell, Mark, Outcome};
