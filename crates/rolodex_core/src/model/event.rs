//! Event envelope, payload registry and structural validation.
//!
//! # Responsibility
//! - Define the immutable unit of change and its closed type registry.
//! - Stamp new events with a stable id and wall-clock timestamp.
//! - Reject structurally malformed events before they reach a reducer.
//!
//! # Invariants
//! - `EventPayload` is the complete registry: an event type outside this
//!   enum cannot be constructed or decoded.
//! - Validation is purely structural; entity existence is a reducer-level
//!   concern because it depends on document state at apply time.
//! - The serialized shape is exactly
//!   `{id, type, entityId?, payload, timestamp, deviceId}`.

use crate::model::relation::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one recorded event.
pub type EventId = Uuid;

/// Interaction category for calendar-bearing activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Meeting,
    Email,
}

/// Interaction lifecycle status.
///
/// Only `Scheduled` interactions accept inbound calendar edits during
/// reconciliation; any other status forces the CRM side to win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// Contact method channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Phone,
    Email,
}

/// One entry in a contact's ordered method list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMethod {
    pub kind: MethodKind,
    pub value: String,
    /// Free-form label such as `work` or `mobile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Reducer family an event routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventFamily {
    Organization,
    Account,
    Contact,
    Note,
    Interaction,
    AccountContact,
    EntityLink,
    Device,
}

impl Display for EventFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Organization => "organization",
            Self::Account => "account",
            Self::Contact => "contact",
            Self::Note => "note",
            Self::Interaction => "interaction",
            Self::AccountContact => "account_contact",
            Self::EntityLink => "entity_link",
            Self::Device => "device",
        };
        write!(f, "{name}")
    }
}

/// Closed payload registry, discriminated by the wire `type` tag.
///
/// Adding a variant here is the only way to introduce a new event type;
/// reducer dispatch is an exhaustive match, so the compiler flags every
/// family that does not yet handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "organization.created")]
    OrganizationCreated(OrganizationCreated),
    #[serde(rename = "organization.updated")]
    OrganizationUpdated(OrganizationUpdated),
    #[serde(rename = "organization.deleted")]
    OrganizationDeleted(EntityRef),

    #[serde(rename = "account.created")]
    AccountCreated(AccountCreated),
    #[serde(rename = "account.updated")]
    AccountUpdated(AccountUpdated),
    #[serde(rename = "account.deleted")]
    AccountDeleted(EntityRef),

    #[serde(rename = "contact.created")]
    ContactCreated(ContactCreated),
    #[serde(rename = "contact.updated")]
    ContactUpdated(ContactUpdated),
    #[serde(rename = "contact.deleted")]
    ContactDeleted(EntityRef),
    #[serde(rename = "contact.method.added")]
    ContactMethodAdded(ContactMethodAdded),
    #[serde(rename = "contact.method.updated")]
    ContactMethodUpdated(ContactMethodUpdated),
    #[serde(rename = "contact.method.removed")]
    ContactMethodRemoved(ContactMethodRemoved),

    #[serde(rename = "note.created")]
    NoteCreated(NoteCreated),
    #[serde(rename = "note.updated")]
    NoteUpdated(NoteUpdated),
    #[serde(rename = "note.deleted")]
    NoteDeleted(EntityRef),
    #[serde(rename = "note.linked")]
    NoteLinked(NoteLinked),
    #[serde(rename = "note.unlinked")]
    NoteUnlinked(NoteUnlinked),

    #[serde(rename = "interaction.logged")]
    InteractionLogged(InteractionLogged),
    #[serde(rename = "interaction.updated")]
    InteractionUpdated(InteractionUpdated),
    #[serde(rename = "interaction.cancelled")]
    InteractionCancelled(EntityRef),
    #[serde(rename = "interaction.deleted")]
    InteractionDeleted(EntityRef),

    #[serde(rename = "account.contact.linked")]
    AccountContactLinked(AccountContactLinked),
    #[serde(rename = "account.contact.primary.set")]
    AccountContactPrimarySet(AccountContactPrimarySet),
    #[serde(rename = "account.contact.unlinked")]
    AccountContactUnlinked(AccountContactUnlinked),

    #[serde(rename = "device.registered")]
    DeviceRegistered(DeviceRegistered),
}

/// Payload for events that only reference one existing entity by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCreated {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdated {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreated {
    pub id: String,
    pub name: String,
    /// Must reference an existing organization when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdated {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reassigns the owning organization; the target must exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCreated {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<ContactMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdated {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMethodAdded {
    pub contact_id: String,
    pub method: ContactMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMethodUpdated {
    pub contact_id: String,
    /// Position in the contact's current method list.
    pub index: usize,
    pub method: ContactMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMethodRemoved {
    pub contact_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreated {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdated {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLinked {
    /// Synthetic relation id; carried in the payload so replay is
    /// deterministic. Not stable across unlink + relink.
    pub link_id: String,
    pub note_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUnlinked {
    pub note_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLogged {
    pub id: String,
    pub kind: InteractionKind,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionUpdated {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InteractionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContactLinked {
    /// Synthetic relation id, carried for deterministic replay.
    pub relation_id: String,
    pub account_id: String,
    pub contact_id: String,
    pub role: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContactPrimarySet {
    /// Explicit relation id; when absent the reducer resolves the unique
    /// `(account, contact, role)` match instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_id: Option<String>,
    pub account_id: String,
    pub contact_id: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContactUnlinked {
    pub account_id: String,
    pub contact_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistered {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl EventPayload {
    /// Returns the static wire tag for this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrganizationCreated(_) => "organization.created",
            Self::OrganizationUpdated(_) => "organization.updated",
            Self::OrganizationDeleted(_) => "organization.deleted",
            Self::AccountCreated(_) => "account.created",
            Self::AccountUpdated(_) => "account.updated",
            Self::AccountDeleted(_) => "account.deleted",
            Self::ContactCreated(_) => "contact.created",
            Self::ContactUpdated(_) => "contact.updated",
            Self::ContactDeleted(_) => "contact.deleted",
            Self::ContactMethodAdded(_) => "contact.method.added",
            Self::ContactMethodUpdated(_) => "contact.method.updated",
            Self::ContactMethodRemoved(_) => "contact.method.removed",
            Self::NoteCreated(_) => "note.created",
            Self::NoteUpdated(_) => "note.updated",
            Self::NoteDeleted(_) => "note.deleted",
            Self::NoteLinked(_) => "note.linked",
            Self::NoteUnlinked(_) => "note.unlinked",
            Self::InteractionLogged(_) => "interaction.logged",
            Self::InteractionUpdated(_) => "interaction.updated",
            Self::InteractionCancelled(_) => "interaction.cancelled",
            Self::InteractionDeleted(_) => "interaction.deleted",
            Self::AccountContactLinked(_) => "account.contact.linked",
            Self::AccountContactPrimarySet(_) => "account.contact.primary.set",
            Self::AccountContactUnlinked(_) => "account.contact.unlinked",
            Self::DeviceRegistered(_) => "device.registered",
        }
    }

    /// Returns the reducer family this payload routes to.
    pub fn family(&self) -> EventFamily {
        match self {
            Self::OrganizationCreated(_)
            | Self::OrganizationUpdated(_)
            | Self::OrganizationDeleted(_) => EventFamily::Organization,
            Self::AccountCreated(_) | Self::AccountUpdated(_) | Self::AccountDeleted(_) => {
                EventFamily::Account
            }
            Self::ContactCreated(_)
            | Self::ContactUpdated(_)
            | Self::ContactDeleted(_)
            | Self::ContactMethodAdded(_)
            | Self::ContactMethodUpdated(_)
            | Self::ContactMethodRemoved(_) => EventFamily::Contact,
            Self::NoteCreated(_) | Self::NoteUpdated(_) | Self::NoteDeleted(_) => EventFamily::Note,
            Self::NoteLinked(_) | Self::NoteUnlinked(_) => EventFamily::EntityLink,
            Self::InteractionLogged(_)
            | Self::InteractionUpdated(_)
            | Self::InteractionCancelled(_)
            | Self::InteractionDeleted(_) => EventFamily::Interaction,
            Self::AccountContactLinked(_)
            | Self::AccountContactPrimarySet(_)
            | Self::AccountContactUnlinked(_) => EventFamily::AccountContact,
            Self::DeviceRegistered(_) => EventFamily::Device,
        }
    }

    /// Returns the id of the entity or relation this payload is scoped to,
    /// when a single one exists.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::OrganizationCreated(p) => Some(&p.id),
            Self::OrganizationUpdated(p) => Some(&p.id),
            Self::OrganizationDeleted(p)
            | Self::AccountDeleted(p)
            | Self::ContactDeleted(p)
            | Self::NoteDeleted(p)
            | Self::InteractionCancelled(p)
            | Self::InteractionDeleted(p) => Some(&p.id),
            Self::AccountCreated(p) => Some(&p.id),
            Self::AccountUpdated(p) => Some(&p.id),
            Self::ContactCreated(p) => Some(&p.id),
            Self::ContactUpdated(p) => Some(&p.id),
            Self::ContactMethodAdded(p) => Some(&p.contact_id),
            Self::ContactMethodUpdated(p) => Some(&p.contact_id),
            Self::ContactMethodRemoved(p) => Some(&p.contact_id),
            Self::NoteCreated(p) => Some(&p.id),
            Self::NoteUpdated(p) => Some(&p.id),
            Self::NoteLinked(p) => Some(&p.link_id),
            Self::NoteUnlinked(p) => Some(&p.note_id),
            Self::InteractionLogged(p) => Some(&p.id),
            Self::InteractionUpdated(p) => Some(&p.id),
            Self::AccountContactLinked(p) => Some(&p.relation_id),
            Self::AccountContactPrimarySet(p) => p.relation_id.as_deref(),
            Self::AccountContactUnlinked(_) => None,
            Self::DeviceRegistered(p) => Some(&p.device_id),
        }
    }
}

/// Immutable unit of change.
///
/// Serialized wire/persisted shape (camelCase):
/// `{id, type, entityId?, payload, timestamp, deviceId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
}

impl Event {
    /// Stamps a new event from a payload: fresh v4 id, `now` timestamp and
    /// the denormalized scoped entity id. Does not apply or persist it.
    pub fn record(payload: EventPayload, device_id: impl Into<String>) -> Self {
        Self::recorded_at(payload, device_id, Utc::now())
    }

    /// Stamps a new event with a caller-provided timestamp.
    ///
    /// Used by reconciliation (which records the pass clock) and by tests
    /// that need deterministic times.
    pub fn recorded_at(
        payload: EventPayload,
        device_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let entity_id = payload.entity_id().map(str::to_owned);
        Self {
            id: Uuid::new_v4(),
            payload,
            entity_id,
            timestamp,
            device_id: device_id.into(),
        }
    }
}

/// Structural validation failure for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// A required string field is empty or whitespace.
    EmptyField {
        event_type: &'static str,
        field: &'static str,
    },
    /// The envelope `entity_id` disagrees with the payload's own id.
    EntityIdMismatch {
        event_type: &'static str,
        expected: Option<String>,
        found: Option<String>,
    },
    /// `scheduled_end` precedes `scheduled_start`.
    InvalidTimeRange { event_type: &'static str },
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { event_type, field } => {
                write!(f, "{event_type}: field `{field}` must not be empty")
            }
            Self::EntityIdMismatch {
                event_type,
                expected,
                found,
            } => write!(
                f,
                "{event_type}: entity_id {found:?} does not match payload id {expected:?}"
            ),
            Self::InvalidTimeRange { event_type } => {
                write!(f, "{event_type}: scheduled_end precedes scheduled_start")
            }
        }
    }
}

impl Error for EventValidationError {}

/// Validates the structural shape of one event.
///
/// # Contract
/// - Pure predicate; no document state is consulted.
/// - Type-registry membership and timestamp parse failures cannot occur on
///   an in-memory `Event` (the payload enum and `DateTime` types make them
///   unrepresentable); the store decode path reports those as invalid data.
pub fn validate_event(event: &Event) -> Result<(), EventValidationError> {
    let kind = event.payload.kind();

    if event.device_id.trim().is_empty() {
        return Err(EventValidationError::EmptyField {
            event_type: kind,
            field: "deviceId",
        });
    }

    let expected = event.payload.entity_id();
    if event.entity_id.as_deref() != expected {
        return Err(EventValidationError::EntityIdMismatch {
            event_type: kind,
            expected: expected.map(str::to_owned),
            found: event.entity_id.clone(),
        });
    }

    for (field, value) in required_fields(&event.payload) {
        if value.trim().is_empty() {
            return Err(EventValidationError::EmptyField {
                event_type: kind,
                field,
            });
        }
    }

    if let Some((start, end)) = scheduled_range(&event.payload) {
        if end < start {
            return Err(EventValidationError::InvalidTimeRange { event_type: kind });
        }
    }

    Ok(())
}

/// Returns the required non-empty string fields for one payload.
fn required_fields(payload: &EventPayload) -> Vec<(&'static str, &str)> {
    match payload {
        EventPayload::OrganizationCreated(p) => vec![("id", &p.id), ("name", &p.name)],
        EventPayload::OrganizationUpdated(p) => vec![("id", &p.id)],
        EventPayload::OrganizationDeleted(p)
        | EventPayload::AccountDeleted(p)
        | EventPayload::ContactDeleted(p)
        | EventPayload::NoteDeleted(p)
        | EventPayload::InteractionCancelled(p)
        | EventPayload::InteractionDeleted(p) => vec![("id", &p.id)],
        EventPayload::AccountCreated(p) => vec![("id", &p.id), ("name", &p.name)],
        EventPayload::AccountUpdated(p) => vec![("id", &p.id)],
        EventPayload::ContactCreated(p) => {
            vec![("id", &p.id), ("displayName", &p.display_name)]
        }
        EventPayload::ContactUpdated(p) => vec![("id", &p.id)],
        EventPayload::ContactMethodAdded(p) => {
            vec![("contactId", &p.contact_id), ("method.value", &p.method.value)]
        }
        EventPayload::ContactMethodUpdated(p) => {
            vec![("contactId", &p.contact_id), ("method.value", &p.method.value)]
        }
        EventPayload::ContactMethodRemoved(p) => vec![("contactId", &p.contact_id)],
        EventPayload::NoteCreated(p) => vec![("id", &p.id)],
        EventPayload::NoteUpdated(p) => vec![("id", &p.id)],
        EventPayload::NoteLinked(p) => vec![
            ("linkId", &p.link_id),
            ("noteId", &p.note_id),
            ("targetId", &p.target_id),
        ],
        EventPayload::NoteUnlinked(p) => {
            vec![("noteId", &p.note_id), ("targetId", &p.target_id)]
        }
        EventPayload::InteractionLogged(p) => vec![("id", &p.id), ("subject", &p.subject)],
        EventPayload::InteractionUpdated(p) => vec![("id", &p.id)],
        EventPayload::AccountContactLinked(p) => vec![
            ("relationId", &p.relation_id),
            ("accountId", &p.account_id),
            ("contactId", &p.contact_id),
            ("role", &p.role),
        ],
        EventPayload::AccountContactPrimarySet(p) => vec![
            ("accountId", &p.account_id),
            ("contactId", &p.contact_id),
            ("role", &p.role),
        ],
        EventPayload::AccountContactUnlinked(p) => {
            vec![("accountId", &p.account_id), ("contactId", &p.contact_id)]
        }
        EventPayload::DeviceRegistered(p) => vec![("deviceId", &p.device_id)],
    }
}

fn scheduled_range(payload: &EventPayload) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match payload {
        EventPayload::InteractionLogged(p) => Some((p.scheduled_start?, p.scheduled_end?)),
        EventPayload::InteractionUpdated(p) => Some((p.scheduled_start?, p.scheduled_end?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        validate_event, Event, EventFamily, EventPayload, EventValidationError, OrganizationCreated,
    };
    use chrono::{TimeZone, Utc};

    fn org_created(id: &str, name: &str) -> EventPayload {
        EventPayload::OrganizationCreated(OrganizationCreated {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    #[test]
    fn record_stamps_id_timestamp_and_entity_id() {
        let event = Event::record(org_created("org-1", "Acme"), "device-1");
        assert_eq!(event.entity_id.as_deref(), Some("org-1"));
        assert_eq!(event.payload.kind(), "organization.created");
        assert_eq!(event.payload.family(), EventFamily::Organization);
        validate_event(&event).expect("recorded event should validate");
    }

    #[test]
    fn wire_shape_matches_contract() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let event = Event::recorded_at(org_created("org-1", "Acme"), "device-1", timestamp);
        let json = serde_json::to_value(&event).expect("event should serialize");

        assert_eq!(json["type"], "organization.created");
        assert_eq!(json["entityId"], "org-1");
        assert_eq!(json["deviceId"], "device-1");
        assert_eq!(json["payload"]["name"], "Acme");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-03-01T12:00:00"));

        let decoded: Event = serde_json::from_value(json).expect("event should decode");
        assert_eq!(decoded, event);
    }

    #[test]
    fn unknown_type_tag_is_rejected_at_decode() {
        let raw = r#"{
            "id": "4f9c2a9e-9f6f-4ff1-b5b6-0f2fd25f3a10",
            "type": "organization.renamed",
            "payload": {"id": "org-1"},
            "timestamp": "2024-03-01T12:00:00Z",
            "deviceId": "device-1"
        }"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }

    #[test]
    fn unparsable_timestamp_is_rejected_at_decode() {
        let raw = r#"{
            "id": "4f9c2a9e-9f6f-4ff1-b5b6-0f2fd25f3a10",
            "type": "organization.created",
            "payload": {"id": "org-1", "name": "Acme"},
            "timestamp": "yesterday",
            "deviceId": "device-1"
        }"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }

    #[test]
    fn empty_required_field_fails_validation() {
        let event = Event::record(org_created("org-1", "   "), "device-1");
        let err = validate_event(&event).expect_err("blank name must fail");
        assert!(matches!(
            err,
            EventValidationError::EmptyField { field: "name", .. }
        ));
    }

    #[test]
    fn entity_id_mismatch_fails_validation() {
        let mut event = Event::record(org_created("org-1", "Acme"), "device-1");
        event.entity_id = Some("org-2".to_string());
        let err = validate_event(&event).expect_err("mismatched entity id must fail");
        assert!(matches!(err, EventValidationError::EntityIdMismatch { .. }));
    }
}
