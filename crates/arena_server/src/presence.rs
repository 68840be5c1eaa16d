//! Presence bookkeeping and permanent mark assignment.

use std::collections::HashMap;

use arena_tictactoe::Mark;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Identity issued by the session layer.
pub type UserId = String;

/// A connected player's session handle within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Presence {
    user_id: UserId,
    session_id: String,
    username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seat {
    mark: Mark,
    sequence: u64,
}

/// Who is connected and which mark each player owns.
///
/// Marks are handed out by join sequence, not map order: the first player
/// ever seen gets X, the second O. Seats outlive presences, so a player who
/// leaves and rejoins keeps their mark and settlement still sees both.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    present: HashMap<UserId, Presence>,
    seats: HashMap<UserId, Seat>,
    nicknames: HashMap<UserId, String>,
    joins: u64,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connected presences.
    pub fn len(&self) -> usize {
        self.present.len()
    }

    /// True when nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// True when `user_id` is currently connected.
    pub fn contains(&self, user_id: &str) -> bool {
        self.present.contains_key(user_id)
    }

    /// Adds a presence and seats it if the player is new.
    ///
    /// Returns the player's mark. A third distinct player never gets one.
    #[instrument(skip(self, presence), fields(user_id = %presence.user_id()))]
    pub fn admit(&mut self, presence: Presence) -> Option<Mark> {
        let user_id = presence.user_id().clone();
        self.nicknames
            .insert(user_id.clone(), presence.username().clone());
        self.present.insert(user_id.clone(), presence);

        if let Some(seat) = self.seats.get(&user_id) {
            debug!(mark = %seat.mark, "Returning player keeps mark");
            return Some(seat.mark);
        }

        let sequence = self.joins;
        self.joins += 1;
        let mark = match sequence {
            0 => Mark::X,
            1 => Mark::O,
            _ => {
                debug!(sequence, "No mark left for newcomer");
                return None;
            }
        };
        self.seats.insert(user_id, Seat { mark, sequence });
        debug!(%mark, sequence, "Mark assigned");
        Some(mark)
    }

    /// Removes a presence. Seats are kept.
    pub fn remove(&mut self, user_id: &str) -> Option<Presence> {
        self.present.remove(user_id)
    }

    /// Mark owned by `user_id`, present or not.
    pub fn mark_of(&self, user_id: &str) -> Option<Mark> {
        self.seats.get(user_id).map(|s| s.mark)
    }

    /// Player owning `mark`.
    pub fn holder_of(&self, mark: Mark) -> Option<&UserId> {
        self.seats
            .iter()
            .find(|(_, seat)| seat.mark == mark)
            .map(|(user_id, _)| user_id)
    }

    /// Last known username of a seated or present player.
    pub fn nickname_of(&self, user_id: &str) -> Option<&str> {
        self.nicknames.get(user_id).map(String::as_str)
    }

    /// Seated players with their marks, in join order.
    pub fn seated(&self) -> Vec<(UserId, Mark)> {
        let mut seated: Vec<_> = self
            .seats
            .iter()
            .map(|(user_id, seat)| (seat.sequence, user_id.clone(), seat.mark))
            .collect();
        seated.sort_by_key(|(sequence, _, _)| *sequence);
        seated
            .into_iter()
            .map(|(_, user_id, mark)| (user_id, mark))
            .collect()
    }

    /// Mapping of every seated player to their mark.
    pub fn symbol_of(&self) -> HashMap<UserId, Mark> {
        self.seats
            .iter()
            .map(|(user_id, seat)| (user_id.clone(), seat.mark))
            .collect()
    }
}
