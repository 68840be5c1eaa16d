//! Outbound delivery of match state to participants.

use derive_more::{Display, Error};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::messages::StateUpdate;

/// Serialized outbound message as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Message op code.
    pub op_code: i64,
    /// JSON payload.
    pub payload: String,
}

/// Delivery failure reported by a [`Broadcaster`].
#[derive(Debug, Clone, Display, Error)]
#[display("Broadcast failed: {}", message)]
pub struct BroadcastError {
    /// What went wrong.
    pub message: String,
}

impl BroadcastError {
    /// Creates a new broadcast error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends a state update reliably to every participant of one match.
///
/// Calls are made in move-application order and must not be coalesced.
pub trait Broadcaster: Send + Sync {
    /// Delivers `update` under `op_code` to all participants.
    fn broadcast(&self, op_code: i64, update: &StateUpdate) -> Result<(), BroadcastError>;
}

/// Broadcaster backed by a tokio broadcast channel; each subscriber is a
/// connected session.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Outbound>,
}

impl ChannelBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` messages per subscriber.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Opens a new subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    #[instrument(skip(self, update), fields(board = %update.board()))]
    fn broadcast(&self, op_code: i64, update: &StateUpdate) -> Result<(), BroadcastError> {
        let payload = serde_json::to_string(update)
            .map_err(|e| BroadcastError::new(format!("Failed to encode update: {}", e)))?;

        match self.tx.send(Outbound { op_code, payload }) {
            Ok(receivers) => debug!(receivers, "Update broadcast"),
            // Nobody is connected; there is no one to deliver to.
            Err(_) => debug!("No subscribers for update"),
        }
        Ok(())
    }
}
