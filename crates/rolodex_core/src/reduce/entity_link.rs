//! Note↔entity link reducer.
//!
//! Unlinking removes the relation record entirely; there is no tombstone
//! and link ids are not stable across relink.

use crate::doc::Document;
use crate::model::event::{Event, EventPayload};
use crate::model::relation::{EntityKind, EntityLink};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::NoteLinked(payload) => {
            if doc.entity_links.contains_key(&payload.link_id) {
                return Err(ReduceError::RelationAlreadyExists {
                    kind: "entity_link",
                    key: payload.link_id.clone(),
                });
            }
            if !doc.notes.contains_key(&payload.note_id) {
                return Err(ReduceError::EntityNotFound {
                    kind: "note",
                    id: payload.note_id.clone(),
                });
            }
            if !target_exists(doc, payload.target_kind, &payload.target_id) {
                return Err(ReduceError::EntityNotFound {
                    kind: target_kind_name(payload.target_kind),
                    id: payload.target_id.clone(),
                });
            }
            if doc.entity_links.values().any(|link| {
                link.note_id == payload.note_id
                    && link.target_kind == payload.target_kind
                    && link.target_id == payload.target_id
            }) {
                return Err(ReduceError::RelationAlreadyExists {
                    kind: "entity_link",
                    key: format!("{}→{}", payload.note_id, payload.target_id),
                });
            }
            Arc::make_mut(&mut doc.entity_links).insert(
                payload.link_id.clone(),
                EntityLink {
                    id: payload.link_id.clone(),
                    note_id: payload.note_id.clone(),
                    target_kind: payload.target_kind,
                    target_id: payload.target_id.clone(),
                    link_type: payload.link_type.clone(),
                    created_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::NoteUnlinked(payload) => {
            let matching: Vec<String> = doc
                .entity_links
                .values()
                .filter(|link| {
                    link.note_id == payload.note_id
                        && link.target_kind == payload.target_kind
                        && link.target_id == payload.target_id
                })
                .map(|link| link.id.clone())
                .collect();
            if matching.is_empty() {
                return Err(ReduceError::RelationNotFound {
                    kind: "entity_link",
                    key: format!("{}→{}", payload.note_id, payload.target_id),
                });
            }
            let links = Arc::make_mut(&mut doc.entity_links);
            for id in matching {
                links.remove(&id);
            }
            Ok(())
        }
        other => Err(ReduceError::UnhandledEventType {
            family: other.family(),
            event_type: other.kind(),
        }),
    }
}

fn target_exists(doc: &Document, kind: EntityKind, id: &str) -> bool {
    match kind {
        EntityKind::Organization => doc.organizations.contains_key(id),
        EntityKind::Account => doc.accounts.contains_key(id),
        EntityKind::Contact => doc.contacts.contains_key(id),
        EntityKind::Interaction => doc.interactions.contains_key(id),
    }
}

fn target_kind_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => "organization",
        EntityKind::Account => "account",
        EntityKind::Contact => "contact",
        EntityKind::Interaction => "interaction",
    }
}
