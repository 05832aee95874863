//! Interaction family reducer.
//!
//! Interactions are the calendar-bearing records the reconciliation engine
//! pairs with device-calendar events, so their `updated_at` stamp is what
//! sync direction resolution compares against the external clock.

use crate::doc::Document;
use crate::model::entity::Interaction;
use crate::model::event::{Event, EventPayload, InteractionStatus};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::InteractionLogged(payload) => {
            if doc.interactions.contains_key(&payload.id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "interaction",
                    id: payload.id.clone(),
                });
            }
            if let Some(account_id) = &payload.account_id {
                if !doc.accounts.contains_key(account_id) {
                    return Err(ReduceError::EntityNotFound {
                        kind: "account",
                        id: account_id.clone(),
                    });
                }
            }
            if let Some(contact_id) = &payload.contact_id {
                if !doc.contacts.contains_key(contact_id) {
                    return Err(ReduceError::EntityNotFound {
                        kind: "contact",
                        id: contact_id.clone(),
                    });
                }
            }
            Arc::make_mut(&mut doc.interactions).insert(
                payload.id.clone(),
                Interaction {
                    id: payload.id.clone(),
                    kind: payload.kind,
                    subject: payload.subject.clone(),
                    account_id: payload.account_id.clone(),
                    contact_id: payload.contact_id.clone(),
                    scheduled_start: payload.scheduled_start,
                    scheduled_end: payload.scheduled_end,
                    status: InteractionStatus::Scheduled,
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::InteractionUpdated(payload) => {
            let interaction = interaction_mut(doc, &payload.id)?;
            if let Some(subject) = &payload.subject {
                interaction.subject = subject.clone();
            }
            if let Some(start) = payload.scheduled_start {
                interaction.scheduled_start = Some(start);
            }
            if let Some(end) = payload.scheduled_end {
                interaction.scheduled_end = Some(end);
            }
            if let Some(status) = payload.status {
                interaction.status = status;
            }
            interaction.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::InteractionCancelled(payload) => {
            let interaction = interaction_mut(doc, &payload.id)?;
            interaction.status = InteractionStatus::Cancelled;
            interaction.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::InteractionDeleted(payload) => {
            if Arc::make_mut(&mut doc.interactions)
                .remove(&payload.id)
                .is_none()
            {
                return Err(ReduceError::EntityNotFound {
                    kind: "interaction",
                    id: payload.id.clone(),
                });
            }
            Ok(())
        }
        other => Err(ReduceError::UnhandledEventType {
            family: other.family(),
            event_type: other.kind(),
        }),
    }
}

fn interaction_mut<'d>(doc: &'d mut Document, id: &str) -> ReduceResult<&'d mut Interaction> {
    Arc::make_mut(&mut doc.interactions)
        .get_mut(id)
        .ok_or_else(|| ReduceError::EntityNotFound {
            kind: "interaction",
            id: id.to_string(),
        })
}
