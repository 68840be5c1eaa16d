//! Diesel-backed implementation of the persistence statements.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::models::{NewDailyEntry, NewLeaderboardEntry, NewMatch, NewPlayer};
use crate::db::{
    DailyLeaderboardRecord, DbError, DbErrorKind, LeaderboardRecord, MatchParticipantRecord,
    MatchRecord, NewParticipant, ParticipantRating, PlayerRecord, Standing, schema,
};
use crate::store::MatchStore;

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Rating given to players the first time they are seen.
const DEFAULT_INITIAL_RATING: i32 = 1200;

/// SQLite repository for players, matches and leaderboards.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
    initial_rating: i32,
}

impl GameRepository {
    /// Creates a repository for the database file at the given path.
    ///
    /// A connection is opened per statement, so the path must name a file;
    /// `":memory:"` would give every statement a fresh empty database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new(DbErrorKind::Config, "Database path must not be empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self {
            db_path,
            initial_rating: DEFAULT_INITIAL_RATING,
        })
    }

    /// Overrides the rating assigned to newly seen players.
    #[instrument(skip(self))]
    pub fn with_initial_rating(mut self, initial_rating: i32) -> Self {
        self.initial_rating = initial_rating;
        self
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        Ok(SqliteConnection::establish(&self.db_path)?)
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Migration, e.to_string()))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Looks up a player by external identity. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn find_player(&self, external_id: &str) -> Result<Option<PlayerRecord>, DbError> {
        let mut conn = self.connection()?;
        let player = schema::players::table
            .filter(schema::players::external_id.eq(external_id))
            .select(PlayerRecord::as_select())
            .first(&mut conn)
            .optional()?;

        debug!(found = player.is_some(), "Player lookup finished");
        Ok(player)
    }

    /// Loads a match row by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_match(&self, match_id: i32) -> Result<Option<MatchRecord>, DbError> {
        let mut conn = self.connection()?;
        let record = schema::matches::table
            .find(match_id)
            .select(MatchRecord::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(record)
    }

    /// Loads the participant rows of a match.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn match_participants(&self, match_id: i32) -> Result<Vec<MatchParticipantRecord>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::match_players::table
            .filter(schema::match_players::match_id.eq(match_id))
            .order(schema::match_players::symbol.asc())
            .select(MatchParticipantRecord::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// All-time standings, best rating first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn alltime_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardRecord>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::leaderboard_alltime::table
            .order((
                schema::leaderboard_alltime::rating.desc(),
                schema::leaderboard_alltime::wins.desc(),
            ))
            .limit(limit)
            .select(LeaderboardRecord::as_select())
            .load(&mut conn)?;

        info!(count = rows.len(), "All-time leaderboard loaded");
        Ok(rows)
    }

    /// Standings for one period, best rating first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn daily_leaderboard(
        &self,
        period: NaiveDate,
        limit: i64,
    ) -> Result<Vec<DailyLeaderboardRecord>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::leaderboard_daily::table
            .filter(schema::leaderboard_daily::period.eq(period))
            .order(schema::leaderboard_daily::rating.desc())
            .limit(limit)
            .select(DailyLeaderboardRecord::as_select())
            .load(&mut conn)?;

        info!(%period, count = rows.len(), "Daily leaderboard loaded");
        Ok(rows)
    }
}

impl MatchStore for GameRepository {
    #[instrument(skip(self))]
    fn upsert_player(&self, external_id: &str, nickname: &str) -> Result<PlayerRecord, DbError> {
        use schema::players::dsl;

        let mut conn = self.connection()?;
        let new_player = NewPlayer::new(
            external_id.to_string(),
            nickname.to_string(),
            self.initial_rating,
        );

        diesel::insert_into(dsl::players)
            .values(&new_player)
            .on_conflict(dsl::external_id)
            .do_update()
            .set(dsl::nickname.eq(nickname))
            .execute(&mut conn)?;

        let player = dsl::players
            .filter(dsl::external_id.eq(external_id))
            .select(PlayerRecord::as_select())
            .first(&mut conn)?;

        debug!(player_id = player.id(), rating = player.rating(), "Player upserted");
        Ok(player)
    }

    #[instrument(skip(self, snapshot))]
    fn create_match(&self, mode: &str, snapshot: &str) -> Result<i32, DbError> {
        let mut conn = self.connection()?;

        let id = diesel::insert_into(schema::matches::table)
            .values(&NewMatch::new(mode.to_string(), snapshot.to_string()))
            .returning(schema::matches::id)
            .get_result::<i32>(&mut conn)?;

        info!(match_id = id, mode, "Match row created");
        Ok(id)
    }

    #[instrument(skip(self, participant), fields(match_id = participant.match_id(), player_id = participant.player_id()))]
    fn add_participant(&self, participant: NewParticipant) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::match_players::table)
            .values(&participant)
            .execute(&mut conn)?;
        debug!("Participant row inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn participants(&self, match_id: i32) -> Result<Vec<ParticipantRating>, DbError> {
        use schema::{match_players, players};

        let mut conn = self.connection()?;
        let rows = match_players::table
            .inner_join(players::table)
            .filter(match_players::match_id.eq(match_id))
            .order(match_players::symbol.asc())
            .select((
                match_players::player_id,
                players::external_id,
                match_players::symbol,
                match_players::rating_before,
            ))
            .load::<ParticipantRating>(&mut conn)?;

        debug!(count = rows.len(), "Participants loaded");
        Ok(rows)
    }

    #[instrument(skip(self))]
    fn update_player_rating(&self, player_id: i32, rating: i32) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(schema::players::table.find(player_id))
            .set(schema::players::rating.eq(rating))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DbError::new(
                DbErrorKind::NotFound,
                format!("No player with id {}", player_id),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn set_rating_after(&self, match_id: i32, player_id: i32, rating: i32) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::update(schema::match_players::table.find((match_id, player_id)))
            .set(schema::match_players::rating_after.eq(Some(rating)))
            .execute(&mut conn)?;
        Ok(())
    }

    #[instrument(skip(self, snapshot))]
    fn finish_match(
        &self,
        match_id: i32,
        snapshot: &str,
        winner_player_id: Option<i32>,
        ended_at: NaiveDateTime,
    ) -> Result<(), DbError> {
        use schema::matches::dsl;

        let mut conn = self.connection()?;
        diesel::update(dsl::matches.find(match_id))
            .set((
                dsl::state_snapshot.eq(snapshot),
                dsl::winner_player_id.eq(winner_player_id),
                dsl::ended_at.eq(Some(ended_at)),
            ))
            .execute(&mut conn)?;

        info!(match_id, ?winner_player_id, "Match end state stored");
        Ok(())
    }

    #[instrument(skip(self))]
    fn record_alltime(&self, player_id: i32, standing: Standing, rating: i32) -> Result<(), DbError> {
        use schema::leaderboard_alltime::dsl;

        let (wins, losses) = standing.increments();
        let mut conn = self.connection()?;
        diesel::insert_into(dsl::leaderboard_alltime)
            .values(&NewLeaderboardEntry::new(player_id, wins, losses, rating))
            .on_conflict(dsl::player_id)
            .do_update()
            .set((
                dsl::wins.eq(dsl::wins + wins),
                dsl::losses.eq(dsl::losses + losses),
                dsl::rating.eq(rating),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn record_daily(&self, player_id: i32, period: NaiveDate, rating: i32) -> Result<(), DbError> {
        use schema::leaderboard_daily::dsl;

        let mut conn = self.connection()?;
        diesel::insert_into(dsl::leaderboard_daily)
            .values(&NewDailyEntry::new(player_id, period, 0, 0, rating))
            .on_conflict((dsl::player_id, dsl::period))
            .do_update()
            .set(dsl::rating.eq(rating))
            .execute(&mut conn)?;
        Ok(())
    }
}
