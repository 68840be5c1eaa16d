//! Settlement and leaderboard writes against a real SQLite database.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use arena_server::{
    Board, Mark, Match, MatchData, MatchSettings, MatchStore, NewParticipant, Outcome,
    SettlementInput, SettlementService, SettlementStep, Snapshot,
};
use common::{RecordingBroadcaster, RecordingStore, at, presence, setup_test_db, t0};

fn symbols(x: &str, o: &str) -> HashMap<String, Mark> {
    HashMap::from([(x.to_string(), Mark::X), (o.to_string(), Mark::O)])
}

#[test]
fn test_even_match_moves_ratings_by_ten() {
    let (_db, repo) = setup_test_db();
    let repo = Arc::new(repo);
    let mut game = Match::init(
        "match-1",
        MatchSettings::default(),
        t0(),
        Arc::new(RecordingBroadcaster::default()),
        repo.clone(),
    );
    game.join(vec![presence("alice"), presence("bob")]);
    let match_id = game.state().persisted_match_id().expect("match persisted");

    for (i, (sender, index)) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4), ("alice", 2)]
        .into_iter()
        .enumerate()
    {
        game.tick(at(i as i64 + 1), &[MatchData::move_to(sender, index)]);
    }
    assert!(*game.state().settled());

    let alice = repo.find_player("alice").unwrap().unwrap();
    let bob = repo.find_player("bob").unwrap().unwrap();
    assert_eq!(*alice.rating(), 1210);
    assert_eq!(*bob.rating(), 1190);
    assert_eq!(alice.nickname(), "nick-alice");

    let record = repo.get_match(match_id).unwrap().unwrap();
    assert_eq!(*record.winner_player_id(), Some(*alice.id()));
    assert!(record.ended_at().is_some());
    let snapshot: Snapshot = serde_json::from_str(record.state_snapshot()).unwrap();
    assert_eq!(snapshot.board, "XXXOO....");
    assert_eq!(snapshot.winner.as_deref(), Some("X"));

    let rows = repo.match_participants(match_id).unwrap();
    for row in &rows {
        assert_eq!(*row.rating_before(), 1200);
        let expected = if row.player_id() == alice.id() { 1210 } else { 1190 };
        assert_eq!(*row.rating_after(), Some(expected));
    }

    let board = repo.alltime_leaderboard(10).unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].player_id(), alice.id());
    assert_eq!((*board[0].wins(), *board[0].losses(), *board[0].rating()), (1, 0, 1210));
    assert_eq!((*board[1].wins(), *board[1].losses(), *board[1].rating()), (0, 1, 1190));

    let daily = repo.daily_leaderboard(t0().date_naive(), 10).unwrap();
    assert_eq!(daily.len(), 2);
    assert!(daily.iter().all(|d| *d.wins() == 0 && *d.losses() == 0));
    assert_eq!(*daily[0].rating(), 1210);
}

#[test]
fn test_underdog_win_uses_starting_ratings() {
    let (_db, repo) = setup_test_db();
    let low = repo.upsert_player("low", "Low").unwrap();
    let high = repo.upsert_player("high", "High").unwrap();
    repo.update_player_rating(*high.id(), 1600).unwrap();
    let match_id = repo.create_match("ranked", "{}").unwrap();
    repo.add_participant(NewParticipant::new(match_id, *low.id(), "X".into(), 1200))
        .unwrap();
    repo.add_participant(NewParticipant::new(match_id, *high.id(), "O".into(), 1600))
        .unwrap();

    let service = SettlementService::new(Arc::new(repo.clone()), 20.0);
    let input = SettlementInput::new(
        Some(match_id),
        "XXXOO....".parse::<Board>().unwrap(),
        Mark::X,
        Outcome::Won(Mark::X),
        symbols("low", "high"),
        t0(),
    );
    let report = service.settle(&input).unwrap();

    assert!(report.is_complete());
    assert_eq!(*report.winner_player_id(), Some(*low.id()));
    assert_eq!(*repo.find_player("low").unwrap().unwrap().rating(), 1218);
    assert_eq!(*repo.find_player("high").unwrap().unwrap().rating(), 1582);
}

#[test]
fn test_draw_leaves_counters_and_ratings() {
    let (_db, repo) = setup_test_db();
    let a = repo.upsert_player("a", "A").unwrap();
    let b = repo.upsert_player("b", "B").unwrap();
    let match_id = repo.create_match("casual", "{}").unwrap();
    repo.add_participant(NewParticipant::new(match_id, *a.id(), "X".into(), 1200))
        .unwrap();
    repo.add_participant(NewParticipant::new(match_id, *b.id(), "O".into(), 1200))
        .unwrap();

    let service = SettlementService::new(Arc::new(repo.clone()), 20.0);
    let input = SettlementInput::new(
        Some(match_id),
        "XOXXOOOXX".parse::<Board>().unwrap(),
        Mark::X,
        Outcome::Draw,
        symbols("a", "b"),
        t0(),
    );
    let report = service.settle(&input).unwrap();

    assert_eq!(*report.winner_player_id(), None);
    assert!(report.rating_changes().is_empty());
    assert_eq!(*repo.find_player("a").unwrap().unwrap().rating(), 1200);
    assert!(repo.alltime_leaderboard(10).unwrap().is_empty());
    assert_eq!(repo.daily_leaderboard(t0().date_naive(), 10).unwrap().len(), 2);

    let record = repo.get_match(match_id).unwrap().unwrap();
    assert_eq!(*record.winner_player_id(), None);
    assert!(record.ended_at().is_some());
}

#[test]
fn test_alltime_counters_accumulate_across_matches() {
    let (_db, repo) = setup_test_db();
    let a = repo.upsert_player("a", "A").unwrap();
    let b = repo.upsert_player("b", "B").unwrap();
    let service = SettlementService::new(Arc::new(repo.clone()), 20.0);

    for day in 0..2 {
        let a_rating = *repo.find_player("a").unwrap().unwrap().rating();
        let b_rating = *repo.find_player("b").unwrap().unwrap().rating();
        let match_id = repo.create_match("casual", "{}").unwrap();
        repo.add_participant(NewParticipant::new(match_id, *a.id(), "X".into(), a_rating))
            .unwrap();
        repo.add_participant(NewParticipant::new(match_id, *b.id(), "O".into(), b_rating))
            .unwrap();
        let input = SettlementInput::new(
            Some(match_id),
            Board::new(),
            Mark::O,
            Outcome::Won(Mark::X),
            symbols("a", "b"),
            t0() + chrono::Duration::days(day),
        );
        service.settle(&input).unwrap();
    }

    let board = repo.alltime_leaderboard(10).unwrap();
    assert_eq!(*board[0].wins(), 2);
    assert_eq!(*board[1].losses(), 2);
    // 1200 -> 1210 -> 1219 (expected score above one half after the first win)
    assert_eq!(*board[0].rating(), 1219);

    let second_day = (t0() + chrono::Duration::days(1)).date_naive();
    assert_eq!(repo.daily_leaderboard(t0().date_naive(), 10).unwrap().len(), 2);
    assert_eq!(*repo.daily_leaderboard(second_day, 10).unwrap()[0].rating(), 1219);
}

#[test]
fn test_unpersisted_match_skips_settlement() {
    let store = Arc::new(RecordingStore::default());
    let service = SettlementService::new(store.clone(), 20.0);
    let input = SettlementInput::new(
        None,
        Board::new(),
        Mark::X,
        Outcome::Won(Mark::O),
        symbols("a", "b"),
        t0(),
    );

    let report = service.settle(&input).unwrap();

    assert!(report.skipped());
    assert!(store.calls().is_empty());
}

#[test]
fn test_in_progress_match_is_not_settled() {
    let store = Arc::new(RecordingStore::default());
    let service = SettlementService::new(store.clone(), 20.0);
    let input = SettlementInput::new(
        Some(1),
        Board::new(),
        Mark::X,
        Outcome::InProgress,
        symbols("a", "b"),
        t0(),
    );

    assert!(service.settle(&input).is_err());
    assert!(store.calls().is_empty());
}

#[test]
fn test_failed_steps_are_reported() {
    let store = Arc::new(RecordingStore::default());
    let a = store.upsert_player("a", "A").unwrap();
    let b = store.upsert_player("b", "B").unwrap();
    store
        .add_participant(NewParticipant::new(100, *a.id(), "X".into(), 1200))
        .unwrap();
    store
        .add_participant(NewParticipant::new(100, *b.id(), "O".into(), 1200))
        .unwrap();
    store.fail("set_rating_after", 2);
    store.fail("record_daily", 1);

    let service = SettlementService::new(store.clone(), 20.0);
    let input = SettlementInput::new(
        Some(100),
        Board::new(),
        Mark::X,
        Outcome::Won(Mark::O),
        symbols("a", "b"),
        t0(),
    );
    let report = service.settle(&input).unwrap();

    assert!(!report.is_complete());
    assert_eq!(
        report.failed_steps(),
        &vec![
            SettlementStep::RatingAfter,
            SettlementStep::RatingAfter,
            SettlementStep::DailyLeaderboard,
        ]
    );
    assert_eq!(store.finished().len(), 1);
    assert_eq!(store.alltime(*b.id()), Some((1, 0, 1210)));
    assert_eq!(store.alltime(*a.id()), Some((0, 1, 1190)));
}

#[test]
fn test_single_participant_gets_no_rating_change() {
    let store = Arc::new(RecordingStore::default());
    let a = store.upsert_player("a", "A").unwrap();
    store
        .add_participant(NewParticipant::new(100, *a.id(), "X".into(), 1200))
        .unwrap();

    let service = SettlementService::new(store.clone(), 20.0);
    let input = SettlementInput::new(
        Some(100),
        Board::new(),
        Mark::O,
        Outcome::Won(Mark::X),
        symbols("a", "b"),
        t0(),
    );
    let report = service.settle(&input).unwrap();

    assert!(report.rating_changes().is_empty());
    assert_eq!(store.count("update_player_rating"), 0);
    assert_eq!(store.alltime(*a.id()), Some((1, 0, 1200)));
}
