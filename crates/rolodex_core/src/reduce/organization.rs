//! Organization family reducer.

use crate::doc::Document;
use crate::model::entity::Organization;
use crate::model::event::{Event, EventPayload};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::OrganizationCreated(payload) => {
            if doc.organizations.contains_key(&payload.id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "organization",
                    id: payload.id.clone(),
                });
            }
            Arc::make_mut(&mut doc.organizations).insert(
                payload.id.clone(),
                Organization {
                    id: payload.id.clone(),
                    name: payload.name.clone(),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::OrganizationUpdated(payload) => {
            let organizations = Arc::make_mut(&mut doc.organizations);
            let organization =
                organizations
                    .get_mut(&payload.id)
                    .ok_or_else(|| ReduceError::EntityNotFound {
                        kind: "organization",
                        id: payload.id.clone(),
                    })?;
            if let Some(name) = &payload.name {
                organization.name = name.clone();
            }
            organization.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::OrganizationDeleted(payload) => {
            if Arc::make_mut(&mut doc.organizations).remove(&payload.id).is_none() {
                return Err(ReduceError::EntityNotFound {
                    kind: "organization",
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
