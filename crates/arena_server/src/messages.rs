//! Wire types exchanged with the transport layer.
//!
//! Payloads are JSON. Inbound moves arrive as opaque bytes inside
//! [`MatchData`]; outbound [`StateUpdate`]s are serialized by the broadcaster.

use arena_tictactoe::{Board, Mark, Outcome};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::presence::UserId;

/// Op code carried by move messages and state broadcasts.
pub const OP_MOVE: i64 = 1;

/// One inbound message delivered to a match for the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct MatchData {
    sender: UserId,
    op_code: i64,
    data: Vec<u8>,
}

impl MatchData {
    /// Convenience constructor for a move payload.
    pub fn move_to(sender: impl Into<UserId>, index: i64) -> Self {
        let data = serde_json::json!({ "index": index }).to_string().into_bytes();
        Self::new(sender.into(), OP_MOVE, data)
    }
}

/// Move payload: the target cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    /// Cell index, 0-8. Anything else is dropped by the state machine.
    pub index: i64,
}

impl MoveMessage {
    /// Parses the JSON payload of a move message.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed payloads.
    pub fn parse(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Broadcast after every accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StateUpdate {
    board: String,
    turn: String,
    winner: String,
}

impl StateUpdate {
    /// Builds the update from the current board, turn and outcome.
    pub fn new(board: &Board, turn: Mark, outcome: Outcome) -> Self {
        Self {
            board: board.to_string(),
            turn: turn.to_string(),
            winner: outcome.code().to_string(),
        }
    }
}

/// Serialized board state stored on the match row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Nine-character board string.
    pub board: String,
    /// Mark to move (or that moved last, once decided).
    pub turn: String,
    /// Outcome code; absent until the match is decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl Snapshot {
    /// Snapshot taken when the match row is created.
    pub fn opening(board: &Board, turn: Mark) -> Self {
        Self {
            board: board.to_string(),
            turn: turn.to_string(),
            winner: None,
        }
    }

    /// Snapshot taken at settlement.
    pub fn closing(board: &Board, turn: Mark, outcome: Outcome) -> Self {
        Self {
            winner: Some(outcome.code().to_string()),
            ..Self::opening(board, turn)
        }
    }

    /// JSON text for the `state_snapshot` column.
    pub fn to_json(&self) -> String {
        // A struct of plain strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}
