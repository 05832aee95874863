//! Relation records keyed by synthetic ids.
//!
//! # Responsibility
//! - Define account↔contact and note↔entity link shapes.
//! - Define the external calendar link owned by the reconciliation engine.
//!
//! # Invariants
//! - Relation ids are synthetic and not stable across unlink + relink.
//! - At most one `AccountContactLink` per `(account_id, role)` group has
//!   `is_primary = true` at any document version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity kinds addressable by entity links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Account,
    Contact,
    Interaction,
}

/// Membership of a contact in an account, with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContactLink {
    pub id: String,
    pub account_id: String,
    pub contact_id: String,
    pub role: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attachment of a note to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLink {
    pub id: String,
    pub note_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pairing between a CRM interaction and one device-calendar event.
///
/// Owned exclusively by the reconciliation engine and persisted in the
/// `sync_links` table; never part of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLink {
    pub id: String,
    pub interaction_id: String,
    pub calendar_event_id: String,
    /// Wall clock of the last completed sync pass that visited this link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// External side's own last-modified clock as last observed; only
    /// overwritten by the sync time when we actually wrote externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_external_modified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
