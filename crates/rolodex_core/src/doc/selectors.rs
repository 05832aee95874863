//! Read-only selectors over the document.
//!
//! # Responsibility
//! - Give outer layers (UI, notification glue) stable read access.
//!
//! # Invariants
//! - Selectors never mutate; the dispatcher fold is the only write path.
//! - Iteration order over BTreeMap-backed maps is deterministic.

use crate::doc::Document;
use crate::model::entity::{Contact, Interaction, Note};
use crate::model::relation::{AccountContactLink, EntityKind};

/// Returns notes linked to the given target entity, in note-id order.
pub fn notes_for_entity<'d>(
    doc: &'d Document,
    target_kind: EntityKind,
    target_id: &str,
) -> Vec<&'d Note> {
    let mut note_ids: Vec<&str> = doc
        .entity_links
        .values()
        .filter(|link| link.target_kind == target_kind && link.target_id == target_id)
        .map(|link| link.note_id.as_str())
        .collect();
    note_ids.sort_unstable();
    note_ids.dedup();
    note_ids
        .into_iter()
        .filter_map(|id| doc.notes.get(id))
        .collect()
}

/// Returns the primary contact for `(account, role)`, when one is linked.
pub fn primary_contact<'d>(doc: &'d Document, account_id: &str, role: &str) -> Option<&'d Contact> {
    doc.account_contacts
        .values()
        .find(|link| link.account_id == account_id && link.role == role && link.is_primary)
        .and_then(|link| doc.contacts.get(&link.contact_id))
}

/// Returns every relation attached to the account, in relation-id order.
pub fn links_for_account<'d>(doc: &'d Document, account_id: &str) -> Vec<&'d AccountContactLink> {
    doc.account_contacts
        .values()
        .filter(|link| link.account_id == account_id)
        .collect()
}

/// Returns contacts linked to the account, deduplicated across roles.
pub fn contacts_for_account<'d>(doc: &'d Document, account_id: &str) -> Vec<&'d Contact> {
    let mut contact_ids: Vec<&str> = doc
        .account_contacts
        .values()
        .filter(|link| link.account_id == account_id)
        .map(|link| link.contact_id.as_str())
        .collect();
    contact_ids.sort_unstable();
    contact_ids.dedup();
    contact_ids
        .into_iter()
        .filter_map(|id| doc.contacts.get(id))
        .collect()
}

/// Returns interactions attached to the account, in id order.
pub fn interactions_for_account<'d>(doc: &'d Document, account_id: &str) -> Vec<&'d Interaction> {
    doc.interactions
        .values()
        .filter(|interaction| interaction.account_id.as_deref() == Some(account_id))
        .collect()
}
