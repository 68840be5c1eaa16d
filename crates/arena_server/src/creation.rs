//! Match creation from explicit requests and pairing events.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use derive_getters::Getters;
use derive_new::new;
use tracing::{info, instrument};

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::machine::Match;
use crate::presence::Presence;
use crate::rating::DEFAULT_K_FACTOR;
use crate::settlement::SettlementService;
use crate::state::MatchState;
use crate::store::MatchStore;

/// Mode applied when none is requested.
pub const DEFAULT_MODE: &str = "casual";

/// Property key carrying the mode hint on pairing entries.
pub const MODE_PROPERTY: &str = "mode";

/// Options accepted by a match creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct MatchParams {
    mode: Option<String>,
}

impl MatchParams {
    /// Requests a specific mode. Blank modes fall back to the default.
    pub fn with_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
        }
    }

    /// Builds params from an untyped option map, keeping only a string `mode`.
    pub fn from_options(options: &HashMap<String, serde_json::Value>) -> Self {
        Self {
            mode: options
                .get(MODE_PROPERTY)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

/// One player in a pairing event produced by the matchmaker.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct MatchmakerEntry {
    presence: Presence,
    string_properties: HashMap<String, String>,
}

/// Reads the mode hint from the first matched entry.
#[instrument(skip(entries), fields(count = entries.len()))]
pub fn params_from_pairing(entries: &[MatchmakerEntry]) -> MatchParams {
    MatchParams {
        mode: entries
            .first()
            .and_then(|e| e.string_properties.get(MODE_PROPERTY))
            .cloned(),
    }
}

/// Resolved settings for a new match.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct MatchSettings {
    mode: String,
    turn_timeout: Duration,
    k_factor: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE.to_string(),
            turn_timeout: Duration::seconds(30),
            k_factor: DEFAULT_K_FACTOR,
        }
    }
}

impl MatchSettings {
    /// Applies request params over the configured defaults.
    #[instrument(skip(config))]
    pub fn resolve(params: &MatchParams, config: &ServerConfig) -> Self {
        let mode = params
            .mode
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(config.default_mode().as_str())
            .to_string();
        Self {
            mode,
            turn_timeout: config.turn_timeout(),
            k_factor: *config.k_factor(),
        }
    }
}

impl Match {
    /// Creates a match in its initial state with injected capabilities.
    #[instrument(skip(broadcaster, store), fields(mode = %settings.mode))]
    pub fn init(
        handle: impl Into<String> + std::fmt::Debug,
        settings: MatchSettings,
        now: DateTime<Utc>,
        broadcaster: Arc<dyn Broadcaster>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        let handle = handle.into();
        info!(match_handle = %handle, "Match created");
        Self {
            handle,
            state: MatchState::new(settings.mode, now, settings.turn_timeout),
            turn_timeout: settings.turn_timeout,
            broadcaster,
            settlement: SettlementService::new(Arc::clone(&store), settings.k_factor),
            store,
        }
    }
}
