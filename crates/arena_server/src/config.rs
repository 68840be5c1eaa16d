//! Server configuration loaded from TOML.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable overriding [`ServerConfig::db_path`].
pub const DB_PATH_ENV: &str = "ARENA_DB_PATH";

/// Highest tick rate that still yields a whole-millisecond interval.
pub const MAX_TICK_RATE_HZ: u32 = 1000;

/// Tunables for hosting matches and settling them.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Seconds a player may take before the opponent wins by timeout.
    #[serde(default = "default_turn_timeout_secs")]
    turn_timeout_secs: u64,

    /// Ticks per second driven by the host loop.
    #[serde(default = "default_tick_rate_hz")]
    tick_rate_hz: u32,

    /// Elo K-factor.
    #[serde(default = "default_k_factor")]
    k_factor: f64,

    /// Rating given to players seen for the first time.
    #[serde(default = "default_initial_rating")]
    initial_rating: i32,

    /// Mode used when a match is created without one.
    #[serde(default = "default_mode")]
    default_mode: String,
}

#[instrument]
fn default_db_path() -> String {
    "arena.db".to_string()
}

#[instrument]
fn default_turn_timeout_secs() -> u64 {
    30
}

#[instrument]
fn default_tick_rate_hz() -> u32 {
    1
}

#[instrument]
fn default_k_factor() -> f64 {
    20.0
}

#[instrument]
fn default_initial_rating() -> i32 {
    1200
}

#[instrument]
fn default_mode() -> String {
    "casual".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            turn_timeout_secs: default_turn_timeout_secs(),
            tick_rate_hz: default_tick_rate_hz(),
            k_factor: default_k_factor(),
            initial_rating: default_initial_rating(),
            default_mode: default_mode(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if a
    /// value is out of range.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(db_path = %config.db_path, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if it exists, otherwise falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file is invalid.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies environment overrides (see [`DB_PATH_ENV`]).
    #[instrument(skip(self))]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(DB_PATH_ENV)
            && !path.trim().is_empty()
        {
            info!(db_path = %path, "Database path overridden from environment");
            self.db_path = path;
        }
        self
    }

    /// Replaces the database path.
    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Replaces the turn timeout.
    pub fn with_turn_timeout_secs(mut self, secs: u64) -> Self {
        self.turn_timeout_secs = secs;
        self
    }

    /// Turn timeout as a chrono duration.
    pub fn turn_timeout(&self) -> chrono::Duration {
        i64::try_from(self.turn_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Interval between host ticks.
    pub fn tick_interval(&self) -> std::time::Duration {
        let hz = self.tick_rate_hz.clamp(1, MAX_TICK_RATE_HZ);
        std::time::Duration::from_millis(1000 / u64::from(hz))
    }

    #[instrument(skip(self))]
    fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_timeout_secs == 0 {
            return Err(ConfigError::new("turn_timeout_secs must be positive"));
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(ConfigError::new(format!(
                "tick_rate_hz must be between 1 and {}",
                MAX_TICK_RATE_HZ
            )));
        }
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(ConfigError::new("k_factor must be a positive number"));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
