//! Device-calendar SPI consumed by the reconciliation engine.
//!
//! # Responsibility
//! - Define the opaque read/write oracle the engine reconciles against.
//!
//! # Invariants
//! - `last_modified_at` is the external system's own clock; the engine
//!   never substitutes local time for it when reading.
//! - Timeouts and transport retries are the adapter's concern, not the
//!   engine's.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CalendarResult<T> = Result<T, CalendarError>;

/// Adapter-level failure for one calendar call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The record exists but cannot be interpreted.
    InvalidEvent { id: String, message: String },
    /// Transport or platform failure.
    Backend { message: String },
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEvent { id, message } => {
                write!(f, "calendar event {id} is invalid: {message}")
            }
            Self::Backend { message } => write!(f, "calendar backend failure: {message}"),
        }
    }
}

impl Error for CalendarError {}

/// Snapshot of one external calendar event as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCalendarEvent {
    pub id: String,
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// External system's own last-modified clock; absent on platforms that
    /// do not expose it.
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Minimal field-diff update pushed to the external side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarEventPatch {
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CalendarEventPatch {
    /// True when no field differs and no external write is needed.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start.is_none() && self.end.is_none()
    }
}

/// Opaque read/write oracle over the device calendar.
pub trait CalendarSpi {
    /// Reads one event; `Ok(None)` means the record no longer exists.
    fn get_event(&self, id: &str) -> CalendarResult<Option<ExternalCalendarEvent>>;

    /// Applies a non-empty patch to one event.
    fn update_event(&self, id: &str, patch: &CalendarEventPatch) -> CalendarResult<()>;
}
