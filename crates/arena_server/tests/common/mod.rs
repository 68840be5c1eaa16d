//! Shared test doubles for the match server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arena_server::{
    BroadcastError, Broadcaster, DbError, DbErrorKind, GameRepository, Match, MatchSettings,
    MatchStore, NewParticipant, ParticipantRating, PlayerRecord, Presence, Standing, StateUpdate,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tempfile::NamedTempFile;

/// Fixed start time so deadlines are predictable.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

/// `t0` plus whole seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

pub fn presence(user_id: &str) -> Presence {
    Presence::new(
        user_id.to_string(),
        format!("session-{user_id}"),
        format!("nick-{user_id}"),
    )
}

/// Broadcaster that keeps every update it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(i64, StateUpdate)>>,
    fail: Mutex<bool>,
}

impl RecordingBroadcaster {
    pub fn sent(&self) -> Vec<(i64, StateUpdate)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn boards(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, u)| u.board().clone()).collect()
    }

    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, op_code: i64, update: &StateUpdate) -> Result<(), BroadcastError> {
        self.sent.lock().unwrap().push((op_code, update.clone()));
        if *self.fail.lock().unwrap() {
            return Err(BroadcastError::new("transport down"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    players: Vec<PlayerRecord>,
    matches: Vec<(i32, String, String)>,
    participants: Vec<(i32, NewParticipant)>,
    finished: Vec<(i32, String, Option<i32>, NaiveDateTime)>,
    rating_after: HashMap<(i32, i32), i32>,
    alltime: HashMap<i32, (i32, i32, i32)>,
    daily: HashMap<(i32, NaiveDate), i32>,
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, usize>,
}

/// In-memory store recording every statement, with injectable failures.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: Mutex<StoreInner>,
}

impl RecordingStore {
    /// Makes the next `times` calls to `statement` fail.
    pub fn fail(&self, statement: &'static str, times: usize) {
        self.inner.lock().unwrap().failures.insert(statement, times);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, statement: &str) -> usize {
        self.calls().iter().filter(|c| **c == statement).count()
    }

    pub fn finished(&self) -> Vec<(i32, String, Option<i32>)> {
        self.inner
            .lock()
            .unwrap()
            .finished
            .iter()
            .map(|(id, snap, winner, _)| (*id, snap.clone(), *winner))
            .collect()
    }

    pub fn matches(&self) -> Vec<(i32, String, String)> {
        self.inner.lock().unwrap().matches.clone()
    }

    pub fn participant_rows(&self) -> Vec<NewParticipant> {
        self.inner
            .lock()
            .unwrap()
            .participants
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn player(&self, external_id: &str) -> Option<PlayerRecord> {
        self.inner
            .lock()
            .unwrap()
            .players
            .iter()
            .find(|p| p.external_id() == external_id)
            .cloned()
    }

    /// Inserts a player directly with the given rating, bypassing the call log.
    pub fn upsert_player_for_test(&self, external_id: &str, rating: i32) {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.players.len() as i32 + 1;
        inner.players.push(PlayerRecord::new(
            id,
            external_id.to_string(),
            external_id.to_string(),
            rating,
            t0().naive_utc(),
        ));
    }

    pub fn alltime(&self, player_id: i32) -> Option<(i32, i32, i32)> {
        self.inner.lock().unwrap().alltime.get(&player_id).copied()
    }

    pub fn daily(&self) -> HashMap<(i32, NaiveDate), i32> {
        self.inner.lock().unwrap().daily.clone()
    }

    pub fn rating_after(&self, match_id: i32, player_id: i32) -> Option<i32> {
        self.inner
            .lock()
            .unwrap()
            .rating_after
            .get(&(match_id, player_id))
            .copied()
    }

    fn enter(&self, statement: &'static str) -> Result<std::sync::MutexGuard<'_, StoreInner>, DbError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(statement);
        if let Some(left) = inner.failures.get_mut(statement)
            && *left > 0
        {
            *left -= 1;
            return Err(DbError::new(DbErrorKind::Query, format!("{statement} failed")));
        }
        Ok(inner)
    }
}

impl MatchStore for RecordingStore {
    fn upsert_player(&self, external_id: &str, nickname: &str) -> Result<PlayerRecord, DbError> {
        let mut inner = self.enter("upsert_player")?;
        if let Some(p) = inner.players.iter().find(|p| p.external_id() == external_id) {
            return Ok(p.clone());
        }
        let record = PlayerRecord::new(
            inner.players.len() as i32 + 1,
            external_id.to_string(),
            nickname.to_string(),
            1200,
            t0().naive_utc(),
        );
        inner.players.push(record.clone());
        Ok(record)
    }

    fn create_match(&self, mode: &str, snapshot: &str) -> Result<i32, DbError> {
        let mut inner = self.enter("create_match")?;
        let id = inner.matches.len() as i32 + 100;
        inner.matches.push((id, mode.to_string(), snapshot.to_string()));
        Ok(id)
    }

    fn add_participant(&self, participant: NewParticipant) -> Result<(), DbError> {
        let mut inner = self.enter("add_participant")?;
        let match_id = *participant.match_id();
        inner.participants.push((match_id, participant));
        Ok(())
    }

    fn participants(&self, match_id: i32) -> Result<Vec<ParticipantRating>, DbError> {
        let inner = self.enter("participants")?;
        let rows = inner
            .participants
            .iter()
            .filter(|(id, _)| *id == match_id)
            .filter_map(|(_, p)| {
                let player = inner.players.iter().find(|pl| pl.id() == p.player_id())?;
                Some(ParticipantRating::new(
                    *p.player_id(),
                    player.external_id().clone(),
                    p.symbol().clone(),
                    *p.rating_before(),
                ))
            })
            .collect();
        Ok(rows)
    }

    fn update_player_rating(&self, player_id: i32, rating: i32) -> Result<(), DbError> {
        let mut inner = self.enter("update_player_rating")?;
        if let Some(p) = inner.players.iter_mut().find(|p| *p.id() == player_id) {
            *p = PlayerRecord::new(
                player_id,
                p.external_id().clone(),
                p.nickname().clone(),
                rating,
                *p.created_at(),
            );
        }
        Ok(())
    }

    fn set_rating_after(&self, match_id: i32, player_id: i32, rating: i32) -> Result<(), DbError> {
        let mut inner = self.enter("set_rating_after")?;
        inner.rating_after.insert((match_id, player_id), rating);
        Ok(())
    }

    fn finish_match(
        &self,
        match_id: i32,
        snapshot: &str,
        winner_player_id: Option<i32>,
        ended_at: NaiveDateTime,
    ) -> Result<(), DbError> {
        let mut inner = self.enter("finish_match")?;
        inner
            .finished
            .push((match_id, snapshot.to_string(), winner_player_id, ended_at));
        Ok(())
    }

    fn record_alltime(&self, player_id: i32, standing: Standing, rating: i32) -> Result<(), DbError> {
        let mut inner = self.enter("record_alltime")?;
        let (wins, losses) = standing.increments();
        let entry = inner.alltime.entry(player_id).or_insert((0, 0, rating));
        entry.0 += wins;
        entry.1 += losses;
        entry.2 = rating;
        Ok(())
    }

    fn record_daily(&self, player_id: i32, period: NaiveDate, rating: i32) -> Result<(), DbError> {
        let mut inner = self.enter("record_daily")?;
        inner.daily.insert((player_id, period), rating);
        Ok(())
    }
}

/// A match wired to recording doubles with the standard 30 second timeout.
pub fn recorded_match() -> (Match, Arc<RecordingBroadcaster>, Arc<RecordingStore>) {
    let broadcaster = Arc::new(RecordingBroadcaster::default());
    let store = Arc::new(RecordingStore::default());
    let game = Match::init(
        "match-test",
        MatchSettings::default(),
        t0(),
        broadcaster.clone(),
        store.clone(),
    );
    (game, broadcaster, store)
}

/// A recorded match with alice (X) and bob (O) already joined.
pub fn started_match() -> (Match, Arc<RecordingBroadcaster>, Arc<RecordingStore>) {
    let (mut game, broadcaster, store) = recorded_match();
    game.join(vec![presence("alice"), presence("bob")]);
    (game, broadcaster, store)
}

/// Temporary SQLite database with migrations applied. Keep the file handle
/// alive for as long as the repository is used.
pub fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}
