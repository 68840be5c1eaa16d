//! Persistence error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Which part of the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DbErrorKind {
    /// The repository was configured with an unusable path.
    #[display("config")]
    Config,
    /// The database file could not be opened.
    #[display("connection")]
    Connection,
    /// Embedded migrations could not be applied.
    #[display("migration")]
    Migration,
    /// A statement failed.
    #[display("query")]
    Query,
    /// A statement addressed a row that does not exist.
    #[display("not found")]
    NotFound,
}

/// Store failure with its kind and the location that raised it.
#[derive(Debug, Clone, Display, Error)]
#[display("Database {} error: {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// What failed.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// True when the addressed row does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == DbErrorKind::NotFound
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        let kind = match err {
            diesel::result::Error::NotFound => DbErrorKind::NotFound,
            _ => DbErrorKind::Query,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(DbErrorKind::Connection, err.to_string())
    }
}
