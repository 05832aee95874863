//! Account family reducer.

use crate::doc::Document;
use crate::model::entity::Account;
use crate::model::event::{Event, EventPayload};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::AccountCreated(payload) => {
            if doc.accounts.contains_key(&payload.id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "account",
                    id: payload.id.clone(),
                });
            }
            if let Some(organization_id) = &payload.organization_id {
                if !doc.organizations.contains_key(organization_id) {
                    return Err(ReduceError::EntityNotFound {
                        kind: "organization",
                        id: organization_id.clone(),
                    });
                }
            }
            Arc::make_mut(&mut doc.accounts).insert(
                payload.id.clone(),
                Account {
                    id: payload.id.clone(),
                    name: payload.name.clone(),
                    organization_id: payload.organization_id.clone(),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::AccountUpdated(payload) => {
            if let Some(organization_id) = &payload.organization_id {
                if !doc.organizations.contains_key(organization_id) {
                    return Err(ReduceError::EntityNotFound {
                        kind: "organization",
                        id: organization_id.clone(),
                    });
                }
            }
            let accounts = Arc::make_mut(&mut doc.accounts);
            let account = accounts
                .get_mut(&payload.id)
                .ok_or_else(|| ReduceError::EntityNotFound {
                    kind: "account",
                    id: payload.id.clone(),
                })?;
            if let Some(name) = &payload.name {
                account.name = name.clone();
            }
            if let Some(organization_id) = &payload.organization_id {
                account.organization_id = Some(organization_id.clone());
            }
            account.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::AccountDeleted(payload) => {
            if Arc::make_mut(&mut doc.accounts).remove(&payload.id).is_none() {
                return Err(ReduceError::EntityNotFound {
                    kind: "account",
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
