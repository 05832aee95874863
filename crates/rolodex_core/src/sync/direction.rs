//! Pure sync-direction resolution from the four reconciliation timestamps.

use chrono::{DateTime, Utc};

/// Which side's state wins for one link in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Only the CRM side changed since the last pass, or it won the
    /// both-changed tie-break.
    CrmToExternal,
    /// Only the external side changed, or it won the tie-break.
    ExternalToCrm,
    /// Neither side changed.
    Unchanged,
}

/// Resolves the sync direction by comparing each side's change since the
/// previous pass.
///
/// # Contract
/// - Pure function of the four timestamps; no clock reads.
/// - A side with no recorded baseline (`None`) counts as changed, so a
///   never-synced link flows in the direction of whichever side has data.
/// - An absent `external_modified_at` means the external change cannot be
///   observed and the external side counts as unchanged.
/// - Both-changed resolves last-writer-wins on the newer timestamp; equal
///   timestamps favor the CRM side. This deliberately discards one side's
///   edit instead of merging fields.
pub fn resolve_direction(
    crm_updated_at: DateTime<Utc>,
    external_modified_at: Option<DateTime<Utc>>,
    last_synced_at: Option<DateTime<Utc>>,
    last_external_modified_at: Option<DateTime<Utc>>,
) -> SyncDirection {
    let crm_changed = last_synced_at.map_or(true, |baseline| crm_updated_at > baseline);
    let external_changed = match external_modified_at {
        None => false,
        Some(observed) => {
            last_external_modified_at.map_or(true, |baseline| observed > baseline)
        }
    };

    match (crm_changed, external_changed) {
        (true, false) => SyncDirection::CrmToExternal,
        (false, true) => SyncDirection::ExternalToCrm,
        (false, false) => SyncDirection::Unchanged,
        (true, true) => {
            // Both sides changed; external_modified_at is Some here.
            if external_modified_at > Some(crm_updated_at) {
                SyncDirection::ExternalToCrm
            } else {
                SyncDirection::CrmToExternal
            }
        }
    }
}
