//! Bidirectional reconciliation against the device calendar.
//!
//! # Responsibility
//! - Decide, per external link, which side holds the authoritative update.
//! - Apply that decision: push a minimal patch externally, or synthesize
//!   CRM events and run them through the ordinary fold+append path.
//!
//! # Invariants
//! - Failures are isolated per link; a sync pass always runs to completion
//!   over its link set and always returns a summary.
//! - An external edit never resurrects a CRM-side cancellation.

mod calendar_spi;
mod direction;
mod engine;
mod link_repo;

pub use calendar_spi::{
    CalendarError, CalendarEventPatch, CalendarResult, CalendarSpi, ExternalCalendarEvent,
};
pub use direction::{resolve_direction, SyncDirection};
pub use engine::{SyncEngine, SyncSummary};
pub use link_repo::{LinkRepoError, LinkRepoResult, SqliteSyncLinkRepository, SyncLinkRepository};
