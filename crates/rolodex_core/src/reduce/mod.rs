//! Reducer registry and event-fold dispatcher.
//!
//! # Responsibility
//! - Route each event to its family reducer via an explicit registry value.
//! - Fold event batches into a new document snapshot, strictly in order.
//!
//! # Invariants
//! - The registry is constructed once at process start and passed by
//!   reference; there is no global mutable reducer state.
//! - A fold either applies the whole batch or leaves the caller's document
//!   untouched (the working copy is discarded on the first failure).
//! - An event family missing from the registry is a hard failure, never a
//!   silent no-op; silently dropping an event would desynchronize replay.

use crate::doc::Document;
use crate::model::event::{validate_event, Event, EventFamily, EventValidationError};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod account;
mod account_contact;
mod contact;
mod device;
mod entity_link;
mod interaction;
mod note;
mod organization;

pub type ReduceResult<T> = Result<T, ReduceError>;

/// Fold-fatal reducer failure taxonomy.
///
/// None of these are retried internally; retry/recovery is the caller's
/// decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceError {
    /// Structurally malformed event; rejected before reaching a reducer.
    InvalidEvent(EventValidationError),
    /// A referenced entity is absent from its map at apply time.
    EntityNotFound { kind: &'static str, id: String },
    /// `*.created` targeted an id that already exists.
    DuplicateEntity { kind: &'static str, id: String },
    /// Position-addressed mutation beyond the current list length.
    IndexOutOfBounds {
        contact_id: String,
        index: usize,
        len: usize,
    },
    /// No relation matches the referenced identity or key.
    RelationNotFound { kind: &'static str, key: String },
    /// A relation with the same key already exists.
    RelationAlreadyExists { kind: &'static str, key: String },
    /// A link claimed `is_primary` while another relation already holds it
    /// for the same `(account, role)` group.
    PrimaryConflict {
        account_id: String,
        role: String,
        existing_relation_id: String,
    },
    /// The event's family has no registered reducer.
    UnhandledEventType {
        family: EventFamily,
        event_type: &'static str,
    },
}

impl Display for ReduceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEvent(err) => write!(f, "{err}"),
            Self::EntityNotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateEntity { kind, id } => write!(f, "{kind} already exists: {id}"),
            Self::IndexOutOfBounds {
                contact_id,
                index,
                len,
            } => write!(
                f,
                "method index {index} out of bounds for contact {contact_id} (len {len})"
            ),
            Self::RelationNotFound { kind, key } => write!(f, "{kind} relation not found: {key}"),
            Self::RelationAlreadyExists { kind, key } => {
                write!(f, "{kind} relation already exists: {key}")
            }
            Self::PrimaryConflict {
                account_id,
                role,
                existing_relation_id,
            } => write!(
                f,
                "relation {existing_relation_id} is already primary for ({account_id}, {role})"
            ),
            Self::UnhandledEventType { family, event_type } => {
                write!(f, "no reducer registered for family {family} (event {event_type})")
            }
        }
    }
}

impl Error for ReduceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEvent(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EventValidationError> for ReduceError {
    fn from(value: EventValidationError) -> Self {
        Self::InvalidEvent(value)
    }
}

/// One family reducer: applies a single event to the working document copy.
pub type ReducerFn = fn(&mut Document, &Event) -> ReduceResult<()>;

/// Registration failure when wiring a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateReducer(pub EventFamily);

impl Display for DuplicateReducer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "reducer already registered for family {}", self.0)
    }
}

impl Error for DuplicateReducer {}

/// Explicit reducer-lookup value, constructed once and passed into every
/// fold. Injectable fakes keep the fold testable without core reducers.
pub struct ReducerRegistry {
    reducers: BTreeMap<EventFamily, ReducerFn>,
}

impl ReducerRegistry {
    /// Returns a registry with no reducers. Test seam.
    pub fn empty() -> Self {
        Self {
            reducers: BTreeMap::new(),
        }
    }

    /// Returns the registry wired with every core family reducer.
    pub fn core() -> Self {
        let mut registry = Self::empty();
        // All families are closed variants of EventFamily; a register error
        // here would be a programming bug, so the wiring is infallible.
        let core: [(EventFamily, ReducerFn); 8] = [
            (EventFamily::Organization, organization::apply),
            (EventFamily::Account, account::apply),
            (EventFamily::Contact, contact::apply),
            (EventFamily::Note, note::apply),
            (EventFamily::Interaction, interaction::apply),
            (EventFamily::AccountContact, account_contact::apply),
            (EventFamily::EntityLink, entity_link::apply),
            (EventFamily::Device, device::apply),
        ];
        for (family, reducer) in core {
            registry.reducers.insert(family, reducer);
        }
        registry
    }

    /// Registers one reducer; duplicate family registration is rejected.
    pub fn register(
        &mut self,
        family: EventFamily,
        reducer: ReducerFn,
    ) -> Result<(), DuplicateReducer> {
        if self.reducers.contains_key(&family) {
            return Err(DuplicateReducer(family));
        }
        self.reducers.insert(family, reducer);
        Ok(())
    }

    /// Applies a batch of events strictly in array order and returns the
    /// resulting document.
    ///
    /// # Contract
    /// - Short-circuits on the first validation or reducer failure.
    /// - The caller's `doc` is never mutated; on failure the working copy is
    ///   dropped and the caller retains its last good snapshot.
    /// - `version` advances by one per applied event.
    pub fn fold(&self, doc: &Document, events: &[Event]) -> ReduceResult<Document> {
        let mut next = doc.clone();
        for event in events {
            self.apply(&mut next, event)?;
        }
        Ok(next)
    }

    /// Validates and applies one event to the working copy.
    fn apply(&self, doc: &mut Document, event: &Event) -> ReduceResult<()> {
        validate_event(event)?;

        let family = event.payload.family();
        let reducer = self
            .reducers
            .get(&family)
            .ok_or_else(|| ReduceError::UnhandledEventType {
                family,
                event_type: event.payload.kind(),
            })?;

        reducer(doc, event)?;
        doc.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateReducer, ReduceError, ReduceResult, ReducerRegistry};
    use crate::doc::Document;
    use crate::model::event::{Event, EventFamily, EventPayload, OrganizationCreated};

    fn org_created(id: &str) -> Event {
        Event::record(
            EventPayload::OrganizationCreated(OrganizationCreated {
                id: id.to_string(),
                name: "Acme".to_string(),
            }),
            "device-1",
        )
    }

    #[test]
    fn empty_registry_rejects_every_event() {
        let registry = ReducerRegistry::empty();
        let err = registry
            .fold(&Document::init(), &[org_created("org-1")])
            .expect_err("no reducer is registered");
        assert!(matches!(
            err,
            ReduceError::UnhandledEventType {
                family: EventFamily::Organization,
                ..
            }
        ));
    }

    #[test]
    fn injected_fake_reducer_is_dispatched() {
        fn fake(doc: &mut Document, _event: &Event) -> ReduceResult<()> {
            // Marker mutation so the test can observe dispatch.
            doc.version += 100;
            Ok(())
        }

        let mut registry = ReducerRegistry::empty();
        registry
            .register(EventFamily::Organization, fake)
            .expect("first registration succeeds");
        assert_eq!(
            registry.register(EventFamily::Organization, fake),
            Err(DuplicateReducer(EventFamily::Organization))
        );

        let doc = registry
            .fold(&Document::init(), &[org_created("org-1")])
            .expect("fake reducer should apply");
        // 100 from the fake, 1 from the fold's own version bump.
        assert_eq!(doc.version, 101);
    }

    #[test]
    fn failed_fold_leaves_caller_document_untouched() {
        let registry = ReducerRegistry::core();
        let base = registry
            .fold(&Document::init(), &[org_created("org-1")])
            .expect("create should apply");

        let err = registry
            .fold(&base, &[org_created("org-1")])
            .expect_err("duplicate create must fail");
        assert!(matches!(err, ReduceError::DuplicateEntity { .. }));
        assert_eq!(base.version, 1);
        assert_eq!(base.organizations.len(), 1);
    }
}
