//! Per-pass reconciliation engine.
//!
//! # Responsibility
//! - Walk every external link, resolve the sync direction and apply it.
//! - Keep the pass alive across per-link failures and report counters.
//!
//! # Invariants
//! - A cancelled (or otherwise non-scheduled) interaction is never
//!   overwritten by an external edit; the override forces `CrmToExternal`.
//! - `last_external_modified_at` is only overwritten with local time when
//!   an external write was actually sent; inbound syncs preserve the
//!   external side's own clock.
//! - Stale-link cleanup is best effort: its own failure is logged and
//!   never aborts the pass.

use crate::doc::Document;
use crate::model::entity::Interaction;
use crate::model::event::{Event, EventPayload, InteractionStatus, InteractionUpdated};
use crate::model::relation::ExternalLink;
use crate::reduce::{ReduceError, ReducerRegistry};
use crate::store::{EventLog, StoreError};
use crate::sync::calendar_spi::{
    CalendarError, CalendarEventPatch, CalendarSpi, ExternalCalendarEvent,
};
use crate::sync::direction::{resolve_direction, SyncDirection};
use crate::sync::link_repo::{LinkRepoError, SyncLinkRepository};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::fmt::{Display, Formatter};

/// Counters for one completed sync pass. Always returned, even when every
/// link failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub processed: u32,
    pub crm_to_external: u32,
    pub external_to_crm: u32,
    pub unchanged: u32,
    pub errors: u32,
}

/// Reconciliation engine over one calendar adapter, link repository and
/// event log. Holds no mutable state of its own; each pass reads the
/// current document snapshot and returns the (possibly advanced) next one.
pub struct SyncEngine<'a, C, L, R>
where
    C: CalendarSpi,
    L: EventLog,
    R: SyncLinkRepository,
{
    calendar: &'a C,
    log: &'a L,
    links: &'a R,
    registry: &'a ReducerRegistry,
    device_id: String,
}

/// Any per-link failure; converted into an `errors` counter entry.
#[derive(Debug)]
enum LinkError {
    Calendar(CalendarError),
    Repo(LinkRepoError),
    Store(StoreError),
    Reduce(ReduceError),
    /// The linked external record vanished or the CRM interaction is gone;
    /// the link was cleaned up.
    Stale { reason: &'static str },
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calendar(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Reduce(err) => write!(f, "{err}"),
            Self::Stale { reason } => write!(f, "stale link: {reason}"),
        }
    }
}

impl From<CalendarError> for LinkError {
    fn from(value: CalendarError) -> Self {
        Self::Calendar(value)
    }
}

impl From<LinkRepoError> for LinkError {
    fn from(value: LinkRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<StoreError> for LinkError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ReduceError> for LinkError {
    fn from(value: ReduceError) -> Self {
        Self::Reduce(value)
    }
}

impl<'a, C, L, R> SyncEngine<'a, C, L, R>
where
    C: CalendarSpi,
    L: EventLog,
    R: SyncLinkRepository,
{
    pub fn new(
        calendar: &'a C,
        log: &'a L,
        links: &'a R,
        registry: &'a ReducerRegistry,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            calendar,
            log,
            links,
            registry,
            device_id: device_id.into(),
        }
    }

    /// Runs one reconciliation pass over every link.
    pub fn run_pass(&self, doc: &Document) -> (Document, SyncSummary) {
        self.run_pass_at(doc, Utc::now())
    }

    /// Runs one pass with an injected pass clock. Test seam; `run_pass`
    /// supplies the wall clock.
    pub fn run_pass_at(&self, doc: &Document, now: DateTime<Utc>) -> (Document, SyncSummary) {
        let mut summary = SyncSummary::default();
        let mut doc = doc.clone();

        let links = match self.links.list_links() {
            Ok(links) => links,
            Err(err) => {
                warn!("event=sync_pass module=sync status=error error={err}");
                summary.errors += 1;
                return (doc, summary);
            }
        };

        for link in links {
            summary.processed += 1;
            let link_id = link.id.clone();
            match self.reconcile_link(&mut doc, link, now) {
                Ok(SyncDirection::CrmToExternal) => summary.crm_to_external += 1,
                Ok(SyncDirection::ExternalToCrm) => summary.external_to_crm += 1,
                Ok(SyncDirection::Unchanged) => summary.unchanged += 1,
                Err(err) => {
                    warn!(
                        "event=sync_link module=sync status=error link_id={link_id} error={err}"
                    );
                    summary.errors += 1;
                }
            }
        }

        info!(
            "event=sync_pass module=sync status=ok processed={} crm_to_external={} external_to_crm={} unchanged={} errors={}",
            summary.processed,
            summary.crm_to_external,
            summary.external_to_crm,
            summary.unchanged,
            summary.errors
        );
        (doc, summary)
    }

    /// Reconciles one link and returns the direction that was applied.
    fn reconcile_link(
        &self,
        doc: &mut Document,
        mut link: ExternalLink,
        now: DateTime<Utc>,
    ) -> Result<SyncDirection, LinkError> {
        let Some(interaction) = doc.interactions.get(&link.interaction_id).cloned() else {
            self.cleanup_link(&link.id);
            return Err(LinkError::Stale {
                reason: "interaction no longer exists",
            });
        };

        let external = match self.calendar.get_event(&link.calendar_event_id) {
            Ok(Some(external)) => external,
            Ok(None) => {
                self.cleanup_link(&link.id);
                return Err(LinkError::Stale {
                    reason: "external event no longer exists",
                });
            }
            Err(CalendarError::InvalidEvent { id, message }) => {
                self.cleanup_link(&link.id);
                return Err(LinkError::Calendar(CalendarError::InvalidEvent {
                    id,
                    message,
                }));
            }
            Err(err) => return Err(err.into()),
        };

        let mut direction = resolve_direction(
            interaction.updated_at,
            external.last_modified_at,
            link.last_synced_at,
            link.last_external_modified_at,
        );

        // An external edit must never resurrect a CRM-side cancellation.
        if direction == SyncDirection::ExternalToCrm
            && interaction.status != InteractionStatus::Scheduled
        {
            direction = SyncDirection::CrmToExternal;
        }

        let applied = match direction {
            SyncDirection::ExternalToCrm => {
                self.pull_external(doc, &interaction, &external, now)?;
                link.last_synced_at = Some(now);
                // Preserve the external side's own clock; never substitute
                // the sync time on an inbound flow.
                if external.last_modified_at.is_some() {
                    link.last_external_modified_at = external.last_modified_at;
                }
                SyncDirection::ExternalToCrm
            }
            SyncDirection::CrmToExternal => {
                let patch = build_patch(&interaction, &external);
                link.last_synced_at = Some(now);
                if patch.is_empty() {
                    SyncDirection::Unchanged
                } else {
                    self.calendar.update_event(&link.calendar_event_id, &patch)?;
                    // The write we just sent is now the external side's
                    // latest modification.
                    link.last_external_modified_at = Some(now);
                    SyncDirection::CrmToExternal
                }
            }
            SyncDirection::Unchanged => {
                link.last_synced_at = Some(now);
                SyncDirection::Unchanged
            }
        };

        link.updated_at = now;
        self.links.update_link(&link)?;
        Ok(applied)
    }

    /// Synthesizes CRM events from the external snapshot's differing
    /// fields and runs them through the ordinary fold+append path.
    fn pull_external(
        &self,
        doc: &mut Document,
        interaction: &Interaction,
        external: &ExternalCalendarEvent,
        now: DateTime<Utc>,
    ) -> Result<(), LinkError> {
        let mut update = InteractionUpdated {
            id: interaction.id.clone(),
            subject: None,
            scheduled_start: None,
            scheduled_end: None,
            status: None,
        };
        if external.title != interaction.subject {
            update.subject = Some(external.title.clone());
        }
        if external.start.is_some() && external.start != interaction.scheduled_start {
            update.scheduled_start = external.start;
        }
        if external.end.is_some() && external.end != interaction.scheduled_end {
            update.scheduled_end = external.end;
        }

        if update.subject.is_none()
            && update.scheduled_start.is_none()
            && update.scheduled_end.is_none()
        {
            return Ok(());
        }

        let event = Event::recorded_at(
            EventPayload::InteractionUpdated(update),
            self.device_id.clone(),
            now,
        );
        // Fold first; a rejected event must never reach the durable log.
        let next = self.registry.fold(doc, std::slice::from_ref(&event))?;
        self.log.append_events(std::slice::from_ref(&event))?;
        *doc = next;
        Ok(())
    }

    /// Best-effort removal of a dead link; failure is logged, never
    /// re-thrown, so cleanup cannot abort the pass.
    fn cleanup_link(&self, link_id: &str) {
        if let Err(err) = self.links.delete_link(link_id) {
            warn!(
                "event=sync_link_cleanup module=sync status=error link_id={link_id} error={err}"
            );
        } else {
            info!("event=sync_link_cleanup module=sync status=ok link_id={link_id}");
        }
    }
}

/// Minimal outbound patch: only fields where the CRM side differs.
fn build_patch(interaction: &Interaction, external: &ExternalCalendarEvent) -> CalendarEventPatch {
    let mut patch = CalendarEventPatch::default();
    if interaction.subject != external.title {
        patch.title = Some(interaction.subject.clone());
    }
    if interaction.scheduled_start.is_some() && interaction.scheduled_start != external.start {
        patch.start = interaction.scheduled_start;
    }
    if interaction.scheduled_end.is_some() && interaction.scheduled_end != external.end {
        patch.end = interaction.scheduled_end;
    }
    patch
}
