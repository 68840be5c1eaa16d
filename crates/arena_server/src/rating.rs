//! Elo rating arithmetic.

use tracing::instrument;

/// K-factor applied when no configuration overrides it.
pub const DEFAULT_K_FACTOR: f64 = 20.0;

/// Expected score of a player rated `rating` against `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// New rating after scoring `actual` where `expected` was predicted,
/// rounded to the nearest integer.
pub fn updated_rating(rating: i32, actual: f64, expected: f64, k_factor: f64) -> i32 {
    (f64::from(rating) + k_factor * (actual - expected)).round() as i32
}

/// Ratings of winner and loser after a decisive game, in that order.
#[instrument]
pub fn elo_update(winner: i32, loser: i32, k_factor: f64) -> (i32, i32) {
    let winner_after = updated_rating(winner, 1.0, expected_score(winner, loser), k_factor);
    let loser_after = updated_rating(loser, 0.0, expected_score(loser, winner), k_factor);
    (winner_after, loser_after)
}
