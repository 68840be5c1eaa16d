//! Join admission, presence tracking and match-row creation.

use tracing::{debug, error, info, instrument, warn};

use crate::db::{DbError, NewParticipant};
use crate::machine::Match;
use crate::messages::Snapshot;
use crate::presence::Presence;

/// Most presences a match holds at once.
pub const MAX_PARTICIPANTS: usize = 2;

/// Rejection reason given to a player joining a full match.
pub const MATCH_FULL: &str = "match full";

/// Answer to a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    /// The candidate may join.
    Admit,
    /// The candidate is turned away with a reason.
    Reject(String),
}

impl JoinDecision {
    /// True for [`JoinDecision::Admit`].
    pub fn is_admitted(&self) -> bool {
        matches!(self, JoinDecision::Admit)
    }
}

impl Match {
    /// Decides whether `candidate` may join. Never mutates state.
    #[instrument(skip(self, candidate), fields(match_handle = %self.handle, user_id = %candidate.user_id()))]
    pub fn join_attempt(&self, candidate: &Presence) -> JoinDecision {
        if self.state.roster.len() >= MAX_PARTICIPANTS {
            info!("Join rejected, match full");
            return JoinDecision::Reject(MATCH_FULL.to_string());
        }
        JoinDecision::Admit
    }

    /// Adds admitted presences and assigns marks to first-time players.
    ///
    /// When the match holds two presences for the first time, the match row
    /// and participant rows are written. A write failure is logged and play
    /// continues unpersisted; the write is not attempted again.
    #[instrument(skip(self, newcomers), fields(match_handle = %self.handle, count = newcomers.len()))]
    pub fn join(&mut self, newcomers: Vec<Presence>) {
        for presence in newcomers {
            let user_id = presence.user_id().clone();
            if !self.state.roster.contains(&user_id) && self.state.roster.len() >= MAX_PARTICIPANTS {
                warn!(%user_id, "Join without admission ignored, match full");
                continue;
            }
            let mark = self.state.roster.admit(presence);
            info!(%user_id, mark = ?mark, "Player joined");
        }

        if self.state.roster.len() == MAX_PARTICIPANTS
            && self.state.persisted_match_id.is_none()
            && !self.state.row_creation_attempted
        {
            self.state.row_creation_attempted = true;
            match self.create_rows() {
                Ok(id) => {
                    info!(match_id = id, "Match persisted");
                    self.state.persisted_match_id = Some(id);
                }
                Err(e) => error!(error = %e, "Match row creation failed, continuing unpersisted"),
            }
        }
    }

    /// Removes departing presences. Marks and rating bookkeeping stay, and the
    /// match keeps running so it can still resolve by timeout.
    #[instrument(skip(self, departing), fields(match_handle = %self.handle))]
    pub fn leave(&mut self, departing: &[String]) {
        for user_id in departing {
            if self.state.roster.remove(user_id).is_some() {
                info!(%user_id, "Player left");
            } else {
                debug!(%user_id, "Leave for unknown presence");
            }
        }
    }

    /// Host termination signal. Settlement already did all bookkeeping.
    #[instrument(skip(self), fields(match_handle = %self.handle))]
    pub fn terminate(&mut self) {
        info!(outcome = %self.state.outcome, settled = self.state.settled, "Match terminated");
    }

    fn create_rows(&self) -> Result<i32, DbError> {
        let snapshot = Snapshot::opening(&self.state.board, self.state.turn).to_json();
        let match_id = self.store.create_match(&self.state.mode, &snapshot)?;

        for (user_id, mark) in self.state.roster.seated() {
            let nickname = self.state.roster.nickname_of(&user_id).unwrap_or(user_id.as_str());
            let player = self.store.upsert_player(&user_id, nickname)?;
            self.store.add_participant(NewParticipant::new(
                match_id,
                *player.id(),
                mark.to_string(),
                *player.rating(),
            ))?;
            debug!(%user_id, %mark, rating_before = player.rating(), "Participant recorded");
        }

        Ok(match_id)
    }
}
