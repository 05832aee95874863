//! Document use-case service.
//!
//! # Responsibility
//! - Provide the sanctioned write path: stamp, validate, append, fold.
//! - Hold the current in-memory document between dispatches.
//!
//! # Invariants
//! - Every mutation flows through `dispatch`; the service never edits the
//!   document except by folding appended events.
//! - Fold happens before append: an event a reducer rejects never reaches
//!   the durable log, so replay on the next load cannot trip over it. The
//!   log only ever contains events that applied cleanly.

use crate::doc::Document;
use crate::model::event::{Event, EventPayload};
use crate::reduce::ReducerRegistry;
use crate::store::{EventLog, StoreError, StoreResult};
use log::info;

/// Use-case wrapper owning the live document and its write path.
///
/// The service assumes it is the sole writer on its log for the lifetime
/// of the value; `last_seq` advances arithmetically with each append.
pub struct DocumentService<L: EventLog> {
    log: L,
    registry: ReducerRegistry,
    device_id: String,
    doc: Document,
    last_seq: i64,
}

impl<L: EventLog> DocumentService<L> {
    /// Hydrates the service from the log, replaying into the current
    /// document before accepting dispatches.
    pub fn open(log: L, registry: ReducerRegistry, device_id: impl Into<String>) -> StoreResult<Self> {
        let state = log.load_persisted_state(&registry)?;
        Ok(Self {
            log,
            registry,
            device_id: device_id.into(),
            doc: state.doc,
            last_seq: state.last_seq,
        })
    }

    /// Current document. Cloning it is cheap; the maps are shared.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Stamps one payload with this device's identity and the wall clock,
    /// then appends and folds it.
    pub fn dispatch(&mut self, payload: EventPayload) -> StoreResult<Event> {
        let event = Event::record(payload, self.device_id.clone());
        self.dispatch_event(event)
    }

    /// Folds and appends an already-stamped event. Sync flows use this to
    /// keep their own timestamps.
    pub fn dispatch_event(&mut self, event: Event) -> StoreResult<Event> {
        // Fold first: a rejected event must never reach the durable log,
        // or every later replay would fail on it.
        let next = self
            .registry
            .fold(&self.doc, std::slice::from_ref(&event))
            .map_err(|source| StoreError::Replay {
                event_id: event.id,
                source,
            })?;
        self.log.append_events(std::slice::from_ref(&event))?;
        self.last_seq += 1;
        self.doc = next;

        info!(
            "event=dispatch module=service status=ok type={} version={}",
            event.payload.kind(),
            self.doc.version
        );
        Ok(event)
    }

    /// Folds and appends a batch: the fold applies all-or-nothing to the
    /// in-memory document, and only a fully-applied batch is appended
    /// (atomically on the log side).
    pub fn dispatch_all(&mut self, payloads: Vec<EventPayload>) -> StoreResult<Vec<Event>> {
        let events: Vec<Event> = payloads
            .into_iter()
            .map(|payload| Event::record(payload, self.device_id.clone()))
            .collect();
        if events.is_empty() {
            return Ok(events);
        }

        let next = self.registry.fold(&self.doc, &events).map_err(|source| {
            StoreError::Replay {
                event_id: events[0].id,
                source,
            }
        })?;
        self.log.append_events(&events)?;
        self.last_seq += events.len() as i64;
        self.doc = next;

        info!(
            "event=dispatch_batch module=service status=ok count={} version={}",
            events.len(),
            self.doc.version
        );
        Ok(events)
    }

    /// Persists the snapshot cache at the current log position. Cadence is
    /// the caller's policy; the log stays the source of truth either way.
    pub fn write_snapshot(&self) -> StoreResult<()> {
        self.log.write_snapshot(&self.doc, self.last_seq)
    }

    /// Replaces the in-memory document after an out-of-band fold, such as
    /// a sync pass that appended through the same log.
    pub fn adopt(&mut self, doc: Document, appended: usize) {
        self.doc = doc;
        self.last_seq += appended as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentService;
    use crate::doc::Document;
    use crate::model::event::{Event, EventPayload, OrganizationCreated};
    use crate::reduce::ReducerRegistry;
    use crate::store::{EventLog, PersistedState, StoreResult};
    use std::cell::RefCell;

    /// In-memory log capturing appends; loads replay whatever was captured.
    struct VecLog {
        events: RefCell<Vec<Event>>,
    }

    impl VecLog {
        fn new() -> Self {
            Self {
                events: RefCell::new(Vec::new()),
            }
        }
    }

    impl EventLog for VecLog {
        fn append_events(&self, events: &[Event]) -> StoreResult<()> {
            self.events.borrow_mut().extend_from_slice(events);
            Ok(())
        }

        fn load_events(&self) -> StoreResult<Vec<Event>> {
            Ok(self.events.borrow().clone())
        }

        fn load_persisted_state(&self, registry: &ReducerRegistry) -> StoreResult<PersistedState> {
            let events = self.events.borrow().clone();
            let mut doc = Document::init();
            for event in &events {
                doc = registry
                    .fold(&doc, std::slice::from_ref(event))
                    .map_err(|source| crate::store::StoreError::Replay {
                        event_id: event.id,
                        source,
                    })?;
            }
            let last_seq = events.len() as i64;
            Ok(PersistedState {
                doc,
                events,
                last_seq,
            })
        }

        fn write_snapshot(&self, _doc: &Document, _through_seq: i64) -> StoreResult<()> {
            Ok(())
        }
    }

    fn org_created(id: &str, name: &str) -> EventPayload {
        EventPayload::OrganizationCreated(OrganizationCreated {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    #[test]
    fn dispatch_appends_and_advances_version() {
        let mut service =
            DocumentService::open(VecLog::new(), ReducerRegistry::core(), "device-1").unwrap();

        service.dispatch(org_created("org-1", "Acme")).unwrap();

        assert_eq!(service.document().version, 1);
        assert!(service.document().organizations.contains_key("org-1"));
        assert_eq!(service.log.events.borrow().len(), 1);
    }

    #[test]
    fn rejected_dispatch_leaves_document_untouched() {
        let mut service =
            DocumentService::open(VecLog::new(), ReducerRegistry::core(), "device-1").unwrap();
        service.dispatch(org_created("org-1", "Acme")).unwrap();

        let err = service.dispatch(org_created("org-1", "Acme again"));

        assert!(err.is_err());
        assert_eq!(service.document().version, 1);
        assert_eq!(
            service.document().organizations.get("org-1").map(|o| o.name.as_str()),
            Some("Acme")
        );
        // The rejected event must not have been appended.
        assert_eq!(service.log.events.borrow().len(), 1);
    }

    #[test]
    fn batch_dispatch_folds_in_order() {
        let mut service =
            DocumentService::open(VecLog::new(), ReducerRegistry::core(), "device-1").unwrap();

        let events = service
            .dispatch_all(vec![
                org_created("org-1", "Acme"),
                org_created("org-2", "Globex"),
            ])
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(service.document().version, 2);
        assert_eq!(service.document().organizations.len(), 2);
    }

    #[test]
    fn reopen_replays_to_same_document() {
        let log = VecLog::new();
        let mut service =
            DocumentService::open(log, ReducerRegistry::core(), "device-1").unwrap();
        service.dispatch(org_created("org-1", "Acme")).unwrap();
        let before = service.document().clone();

        let reopened =
            DocumentService::open(service.log, ReducerRegistry::core(), "device-1").unwrap();

        assert_eq!(reopened.document(), &before);
    }
}
