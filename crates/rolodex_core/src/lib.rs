//! Core domain logic for Rolodex, a local-first event-sourced CRM store.
//! This crate is the single source of truth for business invariants.
//!
//! State lives in an append-only event log; the in-memory [`Document`] is a
//! pure fold of that log and can always be rebuilt by replay.

pub mod db;
pub mod doc;
pub mod logging;
pub mod model;
pub mod reduce;
pub mod service;
pub mod store;
pub mod sync;

pub use doc::Document;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{validate_event, Event, EventId, EventPayload, EventValidationError};
pub use reduce::{ReduceError, ReduceResult, ReducerRegistry};
pub use service::DocumentService;
pub use store::{EventLog, PersistedState, SqliteEventLog, StoreError, StoreResult};
pub use sync::{CalendarSpi, SyncEngine, SyncLinkRepository, SyncSummary};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
