//! Account↔contact relation reducer.
//!
//! # Invariants
//! - At most one relation per `(account_id, role)` group is primary at any
//!   document version; `primary.set` demotes and promotes inside a single
//!   reducer invocation so the invariant is never observably violated.
//! - Unlink removes every relation for `(account_id, contact_id)` across
//!   all roles; a no-match unlink is a hard failure signalling a caller bug
//!   or replay corruption, never a silent no-op.

use crate::doc::Document;
use crate::model::event::{AccountContactPrimarySet, Event, EventPayload};
use crate::model::relation::AccountContactLink;
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::AccountContactLinked(payload) => {
            if doc.account_contacts.contains_key(&payload.relation_id) {
                return Err(ReduceError::RelationAlreadyExists {
                    kind: "account_contact",
                    key: payload.relation_id.clone(),
                });
            }
            if !doc.accounts.contains_key(&payload.account_id) {
                return Err(ReduceError::EntityNotFound {
                    kind: "account",
                    id: payload.account_id.clone(),
                });
            }
            if !doc.contacts.contains_key(&payload.contact_id) {
                return Err(ReduceError::EntityNotFound {
                    kind: "contact",
                    id: payload.contact_id.clone(),
                });
            }
            if doc.account_contacts.values().any(|link| {
                link.account_id == payload.account_id
                    && link.contact_id == payload.contact_id
                    && link.role == payload.role
            }) {
                return Err(ReduceError::RelationAlreadyExists {
                    kind: "account_contact",
                    key: format!(
                        "{}/{} ({})",
                        payload.account_id, payload.contact_id, payload.role
                    ),
                });
            }
            if payload.is_primary {
                if let Some(existing) = doc.account_contacts.values().find(|link| {
                    link.account_id == payload.account_id
                        && link.role == payload.role
                        && link.is_primary
                }) {
                    // Only primary.set demotes an existing primary; a fresh
                    // link must not silently displace it.
                    return Err(ReduceError::PrimaryConflict {
                        account_id: payload.account_id.clone(),
                        role: payload.role.clone(),
                        existing_relation_id: existing.id.clone(),
                    });
                }
            }
            Arc::make_mut(&mut doc.account_contacts).insert(
                payload.relation_id.clone(),
                AccountContactLink {
                    id: payload.relation_id.clone(),
                    account_id: payload.account_id.clone(),
                    contact_id: payload.contact_id.clone(),
                    role: payload.role.clone(),
                    is_primary: payload.is_primary,
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::AccountContactPrimarySet(payload) => set_primary(doc, event, payload),
        EventPayload::AccountContactUnlinked(payload) => {
            let matching: Vec<String> = doc
                .account_contacts
                .values()
                .filter(|link| {
                    link.account_id == payload.account_id && link.contact_id == payload.contact_id
                })
                .map(|link| link.id.clone())
                .collect();
            if matching.is_empty() {
                return Err(ReduceError::RelationNotFound {
                    kind: "account_contact",
                    key: format!("{}/{}", payload.account_id, payload.contact_id),
                });
            }
            let links = Arc::make_mut(&mut doc.account_contacts);
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

/// Resolves the target relation, demotes every other primary in the
/// `(account, role)` group and promotes the target, atomically within this
/// invocation.
fn set_primary(
    doc: &mut Document,
    event: &Event,
    payload: &AccountContactPrimarySet,
) -> ReduceResult<()> {
    let target_id = match &payload.relation_id {
        Some(id) => {
            let link = doc.account_contacts.get(id).ok_or_else(|| {
                ReduceError::RelationNotFound {
                    kind: "account_contact",
                    key: id.clone(),
                }
            })?;
            // An explicit id must still agree with the addressed triple.
            if link.account_id != payload.account_id
                || link.contact_id != payload.contact_id
                || link.role != payload.role
            {
                return Err(ReduceError::RelationNotFound {
                    kind: "account_contact",
                    key: format!(
                        "{} does not match {}/{} ({})",
                        id, payload.account_id, payload.contact_id, payload.role
                    ),
                });
            }
            id.clone()
        }
        None => doc
            .account_contacts
            .values()
            .find(|link| {
                link.account_id == payload.account_id
                    && link.contact_id == payload.contact_id
                    && link.role == payload.role
            })
            .map(|link| link.id.clone())
            .ok_or_else(|| ReduceError::RelationNotFound {
                kind: "account_contact",
                key: format!(
                    "{}/{} ({})",
                    payload.account_id, payload.contact_id, payload.role
                ),
            })?,
    };

    let links = Arc::make_mut(&mut doc.account_contacts);
    for link in links.values_mut() {
        if link.account_id != payload.account_id || link.role != payload.role {
            continue;
        }
        let promote = link.id == target_id;
        if link.is_primary != promote {
            link.is_primary = promote;
            link.updated_at = event.timestamp;
        } else if promote {
            // Re-asserting an existing primary still counts as a mutation.
            link.updated_at = event.timestamp;
        }
    }
    Ok(())
}
