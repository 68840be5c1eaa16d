//! Host-side registry of running matches.
//!
//! Each match owns an inbox and a broadcast channel. Messages are queued as
//! they arrive and handed to the match as one batch per tick, so a match
//! never sees two overlapping ticks. Matches share nothing but the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::broadcast::{ChannelBroadcaster, Outbound};
use crate::config::ServerConfig;
use crate::creation::{MatchParams, MatchSettings, MatchmakerEntry, params_from_pairing};
use crate::lifecycle::JoinDecision;
use crate::machine::{Match, TickReport};
use crate::messages::MatchData;
use crate::presence::Presence;
use crate::state::MatchState;
use crate::store::MatchStore;

/// Buffered broadcasts per subscriber before slow receivers lag.
const CHANNEL_CAPACITY: usize = 64;

/// Registry failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistryError {
    /// No match with this handle is hosted.
    #[display("Unknown match '{}'", _0)]
    UnknownMatch(#[error(not(source))] String),
    /// A lock was poisoned by a panicking holder.
    #[display("Match registry lock poisoned")]
    LockPoisoned,
}

struct HostedMatch {
    game: Match,
    inbox: Vec<MatchData>,
    channel: ChannelBroadcaster,
}

type Slot = Arc<Mutex<HostedMatch>>;

/// Thread-safe collection of hosted matches.
#[derive(Clone)]
pub struct MatchRegistry {
    matches: Arc<Mutex<HashMap<String, Slot>>>,
    next_id: Arc<AtomicU64>,
    store: Arc<dyn MatchStore>,
    config: ServerConfig,
}

impl std::fmt::Debug for MatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MatchRegistry {
    /// Creates an empty registry writing to `store`.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn MatchStore>, config: ServerConfig) -> Self {
        info!("Creating match registry");
        Self {
            matches: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            store,
            config,
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>, RegistryError> {
        self.matches.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    fn slot(&self, handle: &str) -> Result<Slot, RegistryError> {
        self.table()?
            .get(handle)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMatch(handle.to_string()))
    }

    fn with_match<T>(
        &self,
        handle: &str,
        f: impl FnOnce(&mut HostedMatch) -> T,
    ) -> Result<T, RegistryError> {
        let slot = self.slot(handle)?;
        let mut hosted = slot.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(f(&mut hosted))
    }

    /// Creates a match and returns its handle.
    #[instrument(skip(self))]
    pub fn create_match(
        &self,
        params: &MatchParams,
        now: DateTime<Utc>,
    ) -> Result<String, RegistryError> {
        let handle = format!("match-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let settings = MatchSettings::resolve(params, &self.config);
        let channel = ChannelBroadcaster::new(CHANNEL_CAPACITY);
        let game = Match::init(
            handle.clone(),
            settings,
            now,
            Arc::new(channel.clone()),
            Arc::clone(&self.store),
        );

        let hosted = HostedMatch {
            game,
            inbox: Vec::new(),
            channel,
        };
        self.table()?
            .insert(handle.clone(), Arc::new(Mutex::new(hosted)));

        info!(match_handle = %handle, "Match hosted");
        Ok(handle)
    }

    /// Creates a match from an untyped creation request. Only a string
    /// `mode` option is recognized; anything else is ignored.
    #[instrument(skip(self, options), fields(keys = options.len()))]
    pub fn create_match_from_request(
        &self,
        options: &HashMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<String, RegistryError> {
        self.create_match(&MatchParams::from_options(options), now)
    }

    /// Turns a pairing event into a new match.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub fn on_matched(
        &self,
        entries: &[MatchmakerEntry],
        now: DateTime<Utc>,
    ) -> Result<String, RegistryError> {
        let params = params_from_pairing(entries);
        self.create_match(&params, now)
    }

    /// Runs the join attempt and, if admitted, the join.
    #[instrument(skip(self, presence), fields(user_id = %presence.user_id()))]
    pub fn join(&self, handle: &str, presence: Presence) -> Result<JoinDecision, RegistryError> {
        self.with_match(handle, |hosted| {
            let decision = hosted.game.join_attempt(&presence);
            if decision.is_admitted() {
                hosted.game.join(vec![presence]);
            }
            decision
        })
    }

    /// Removes a presence from a match.
    #[instrument(skip(self))]
    pub fn leave(&self, handle: &str, user_id: &str) -> Result<(), RegistryError> {
        self.with_match(handle, |hosted| hosted.game.leave(&[user_id.to_string()]))
    }

    /// Queues a message for the next tick.
    #[instrument(skip(self, data), fields(sender = %data.sender()))]
    pub fn enqueue(&self, handle: &str, data: MatchData) -> Result<(), RegistryError> {
        self.with_match(handle, |hosted| hosted.inbox.push(data))
    }

    /// Subscribes to a match's state broadcasts.
    #[instrument(skip(self))]
    pub fn subscribe(&self, handle: &str) -> Result<broadcast::Receiver<Outbound>, RegistryError> {
        self.with_match(handle, |hosted| hosted.channel.subscribe())
    }

    /// Ticks one match with everything queued since its last tick.
    #[instrument(skip(self))]
    pub fn tick(&self, handle: &str, now: DateTime<Utc>) -> Result<TickReport, RegistryError> {
        self.with_match(handle, |hosted| {
            let batch = std::mem::take(&mut hosted.inbox);
            hosted.game.tick(now, &batch)
        })
    }

    /// Ticks every hosted match once. A failing match is logged and skipped.
    #[instrument(skip(self))]
    pub fn tick_all(&self, now: DateTime<Utc>) -> Vec<(String, TickReport)> {
        let handles = match self.list() {
            Ok(handles) => handles,
            Err(e) => {
                warn!(error = %e, "Could not list matches");
                return Vec::new();
            }
        };

        handles
            .into_iter()
            .filter_map(|handle| match self.tick(&handle, now) {
                Ok(report) => Some((handle, report)),
                Err(e) => {
                    warn!(match_handle = %handle, error = %e, "Tick skipped");
                    None
                }
            })
            .collect()
    }

    /// Delivers the terminate signal and releases the match. Messages still
    /// queued are discarded unapplied.
    #[instrument(skip(self))]
    pub fn terminate(&self, handle: &str) -> Result<(), RegistryError> {
        self.with_match(handle, |hosted| {
            if !hosted.inbox.is_empty() {
                debug!(discarded = hosted.inbox.len(), "Dropping queued messages");
                hosted.inbox.clear();
            }
            hosted.game.terminate();
        })?;
        self.table()?.remove(handle);
        debug!(match_handle = %handle, "Match released");
        Ok(())
    }

    /// Copy of a match's current state.
    #[instrument(skip(self))]
    pub fn state(&self, handle: &str) -> Result<MatchState, RegistryError> {
        self.with_match(handle, |hosted| hosted.game.state().clone())
    }

    /// Handles of all hosted matches, sorted.
    pub fn list(&self) -> Result<Vec<String>, RegistryError> {
        let mut handles: Vec<String> = self.table()?.keys().cloned().collect();
        handles.sort();
        Ok(handles)
    }
}
