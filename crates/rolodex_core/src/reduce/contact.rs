//! Contact family reducer, including position-addressed method edits.

use crate::doc::Document;
use crate::model::entity::Contact;
use crate::model::event::{Event, EventPayload};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::ContactCreated(payload) => {
            if doc.contacts.contains_key(&payload.id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "contact",
                    id: payload.id.clone(),
                });
            }
            Arc::make_mut(&mut doc.contacts).insert(
                payload.id.clone(),
                Contact {
                    id: payload.id.clone(),
                    display_name: payload.display_name.clone(),
                    methods: payload.methods.clone(),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::ContactUpdated(payload) => {
            let contact = contact_mut(doc, &payload.id)?;
            if let Some(display_name) = &payload.display_name {
                contact.display_name = display_name.clone();
            }
            contact.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::ContactDeleted(payload) => {
            if Arc::make_mut(&mut doc.contacts).remove(&payload.id).is_none() {
                return Err(ReduceError::EntityNotFound {
                    kind: "contact",
                    id: payload.id.clone(),
                });
            }
            Ok(())
        }
        EventPayload::ContactMethodAdded(payload) => {
            let contact = contact_mut(doc, &payload.contact_id)?;
            contact.methods.push(payload.method.clone());
            contact.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::ContactMethodUpdated(payload) => {
            let contact = contact_mut(doc, &payload.contact_id)?;
            let len = contact.methods.len();
            let slot = contact.methods.get_mut(payload.index).ok_or(
                ReduceError::IndexOutOfBounds {
                    contact_id: payload.contact_id.clone(),
                    index: payload.index,
                    len,
                },
            )?;
            *slot = payload.method.clone();
            contact.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::ContactMethodRemoved(payload) => {
            let contact = contact_mut(doc, &payload.contact_id)?;
            if payload.index >= contact.methods.len() {
                return Err(ReduceError::IndexOutOfBounds {
                    contact_id: payload.contact_id.clone(),
                    index: payload.index,
                    len: contact.methods.len(),
                });
            }
            contact.methods.remove(payload.index);
            contact.updated_at = event.timestamp;
            Ok(())
        }
        other => Err(ReduceError::UnhandledEventType {
            family: other.family(),
            event_type: other.kind(),
        }),
    }
}

fn contact_mut<'d>(doc: &'d mut Document, id: &str) -> ReduceResult<&'d mut Contact> {
    Arc::make_mut(&mut doc.contacts)
        .get_mut(id)
        .ok_or_else(|| ReduceError::EntityNotFound {
            kind: "contact",
            id: id.to_string(),
        })
}
