//! Durable event-log persistence.
//!
//! # Responsibility
//! - Append-only storage of events and the snapshot replay cache.
//! - Device-identity bootstrap for the writer id stamped on every event.
//!
//! # Invariants
//! - Log order (`events.seq`) is causal order; append never reorders or
//!   deduplicates.
//! - The snapshot is an acceleration cache only; replaying the full log
//!   from the empty document always yields the same state.

use crate::db::DbError;
use crate::model::event::EventId;
use crate::reduce::ReduceError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod device;
mod event_log;

pub use event_log::{EventLog, PersistedState, SqliteEventLog};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error for the event log and device bootstrap.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Replay failed while folding persisted events; the log is corrupt or
    /// was written by an incompatible version.
    Replay {
        event_id: EventId,
        source: ReduceError,
    },
    /// A persisted row cannot be decoded; rejected instead of masked.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Replay { event_id, source } => {
                write!(f, "replay failed at event {event_id}: {source}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Replay { source, .. } => Some(source),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
