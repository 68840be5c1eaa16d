//! Per-tick match state machine.
//!
//! A tick takes the batch of messages queued since the previous tick and
//! processes it synchronously, in arrival order. Illegal or stale moves are
//! silently dropped; every accepted move produces exactly one broadcast.

use std::sync::Arc;

use arena_tictactoe::{Mark, Outcome, PlaceError, check_win, is_full, place_mark};
use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use derive_more::Display;
use tracing::{debug, error, info, instrument, warn};

use crate::broadcast::Broadcaster;
use crate::messages::{MatchData, MoveMessage, OP_MOVE, StateUpdate};
use crate::settlement::{SettlementInput, SettlementService};
use crate::state::{MatchState, deadline_after};
use crate::store::MatchStore;

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters)]
pub struct TickReport {
    accepted: usize,
    dropped: usize,
    timed_out: bool,
    settled: bool,
}

/// Why a message did not change the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Dropped {
    #[display("match already decided")]
    Finished,
    #[display("op code {} is not a move", _0)]
    NotAMove(i64),
    #[display("malformed payload")]
    Malformed,
    #[display("sender does not hold the turn")]
    WrongTurn,
    #[display("{}", _0)]
    Illegal(PlaceError),
}

/// One hosted match with its injected capabilities.
pub struct Match {
    pub(crate) handle: String,
    pub(crate) state: MatchState,
    pub(crate) turn_timeout: Duration,
    pub(crate) broadcaster: Arc<dyn Broadcaster>,
    pub(crate) store: Arc<dyn MatchStore>,
    pub(crate) settlement: SettlementService,
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("turn_timeout", &self.turn_timeout)
            .finish_non_exhaustive()
    }
}

impl Match {
    /// Host-side handle of this match.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Current state.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Runs one tick over the queued `messages`.
    ///
    /// Order of work: the turn timeout is checked first and, if it fires,
    /// the batch is discarded. Otherwise each message is applied in order.
    /// Finally a decided but unsettled match is settled; a settlement that
    /// cannot run is retried on the next tick.
    #[instrument(skip(self, messages), fields(match_handle = %self.handle, batch = messages.len()))]
    pub fn tick(&mut self, now: DateTime<Utc>, messages: &[MatchData]) -> TickReport {
        let mut report = TickReport::default();

        if self.state.is_finished() {
            if !messages.is_empty() {
                debug!("Ignoring messages for decided match");
            }
            report.dropped = messages.len();
        } else if now > self.state.turn_deadline {
            let winner = self.state.turn.other();
            self.state.outcome = Outcome::Won(winner);
            report.timed_out = true;
            report.dropped = messages.len();
            info!(stalled = %self.state.turn, %winner, "Turn timed out");
        } else {
            for msg in messages {
                match self.apply(now, msg) {
                    Ok(()) => report.accepted += 1,
                    Err(reason) => {
                        debug!(sender = %msg.sender(), %reason, "Message dropped");
                        report.dropped += 1;
                    }
                }
            }
        }

        report.settled = self.settle_if_due(now);
        report
    }

    fn apply(&mut self, now: DateTime<Utc>, msg: &MatchData) -> Result<(), Dropped> {
        if self.state.is_finished() {
            return Err(Dropped::Finished);
        }
        if *msg.op_code() != OP_MOVE {
            return Err(Dropped::NotAMove(*msg.op_code()));
        }
        let mv = MoveMessage::parse(msg.data()).map_err(|_| Dropped::Malformed)?;

        let mark = self.state.turn;
        if self.state.roster.mark_of(msg.sender()) != Some(mark) {
            return Err(Dropped::WrongTurn);
        }

        self.state.board = place_mark(&self.state.board, mv.index, mark).map_err(Dropped::Illegal)?;

        if check_win(&self.state.board, mark) {
            self.state.outcome = Outcome::Won(mark);
        } else if is_full(&self.state.board) {
            self.state.outcome = Outcome::Draw;
        } else {
            self.state.turn = mark.other();
            self.state.turn_deadline = deadline_after(now, self.turn_timeout);
        }

        info!(
            sender = %msg.sender(),
            index = mv.index,
            %mark,
            outcome = %self.state.outcome,
            "Move accepted"
        );
        self.publish(mark);
        Ok(())
    }

    fn publish(&self, mover: Mark) {
        let update = StateUpdate::new(&self.state.board, self.state.turn, self.state.outcome);
        if let Err(e) = self.broadcaster.broadcast(OP_MOVE, &update) {
            warn!(%mover, error = %e, "State broadcast failed");
        }
    }

    fn settle_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.state.is_finished() || self.state.settled {
            return false;
        }

        let input = SettlementInput::new(
            self.state.persisted_match_id,
            self.state.board,
            self.state.turn,
            self.state.outcome,
            self.state.roster.symbol_of(),
            now,
        );

        match self.settlement.settle(&input) {
            Ok(report) => {
                self.state.settled = true;
                if !report.is_complete() {
                    warn!(failed = ?report.failed_steps(), "Match settled with missing records");
                }
                true
            }
            Err(e) => {
                error!(error = %e, "Settlement failed, will retry next tick");
                false
            }
        }
    }
}
