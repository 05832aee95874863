//! Versioned document aggregate projected from the event log.
//!
//! # Responsibility
//! - Hold every entity and relation map behind copy-on-write handles.
//! - Provide the canonical empty starting point for all folds.
//!
//! # Invariants
//! - Only reducers (via the dispatcher fold) mutate a document value.
//! - Untouched maps are shared by reference between snapshots, so a
//!   caller's previous document stays valid while a fold is in progress.
//! - `version` increases by exactly one per applied event.

use crate::model::entity::{Account, Contact, Device, Interaction, Note, Organization};
use crate::model::relation::{AccountContactLink, EntityLink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod selectors;

/// Copy-on-write entity/relation map. `Arc::make_mut` clones the map only
/// when the handle is shared, which keeps prior snapshots intact without
/// copying untouched subtrees.
pub type CowMap<V> = Arc<BTreeMap<String, V>>;

/// The single projected aggregate. Cheap to clone: cloning bumps the map
/// handles, it does not copy entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: u64,
    pub organizations: CowMap<Organization>,
    pub accounts: CowMap<Account>,
    pub contacts: CowMap<Contact>,
    pub notes: CowMap<Note>,
    pub interactions: CowMap<Interaction>,
    pub devices: CowMap<Device>,
    pub account_contacts: CowMap<AccountContactLink>,
    pub entity_links: CowMap<EntityLink>,
}

impl Document {
    /// Returns the canonical empty document: every map empty, version zero.
    ///
    /// All valid documents are reachable from this value by folding some
    /// event-log prefix; no other constructor exists.
    pub fn init() -> Self {
        Self::default()
    }

    /// Total number of entities across all entity maps.
    pub fn entity_count(&self) -> usize {
        self.organizations.len()
            + self.accounts.len()
            + self.contacts.len()
            + self.notes.len()
            + self.interactions.len()
            + self.devices.len()
    }

    /// Total number of relation records.
    pub fn relation_count(&self) -> usize {
        self.account_contacts.len() + self.entity_links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use std::sync::Arc;

    #[test]
    fn init_is_empty_at_version_zero() {
        let doc = Document::init();
        assert_eq!(doc.version, 0);
        assert_eq!(doc.entity_count(), 0);
        assert_eq!(doc.relation_count(), 0);
    }

    #[test]
    fn clone_shares_untouched_maps_by_reference() {
        let doc = Document::init();
        let snapshot = doc.clone();
        assert!(Arc::ptr_eq(&doc.contacts, &snapshot.contacts));
        assert!(Arc::ptr_eq(&doc.account_contacts, &snapshot.account_contacts));
    }

    #[test]
    fn document_round_trips_through_snapshot_json() {
        let mut doc = Document::init();
        Arc::make_mut(&mut doc.organizations).insert(
            "org-1".to_string(),
            crate::model::entity::Organization {
                id: "org-1".to_string(),
                name: "Initech".to_string(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
        );
        doc.version = 1;

        let json = serde_json::to_string(&doc).expect("document should serialize");
        let decoded: Document = serde_json::from_str(&json).expect("document should decode");
        assert_eq!(decoded, doc);
    }
}
