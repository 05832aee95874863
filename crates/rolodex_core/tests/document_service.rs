use chrono::{DateTime, TimeZone, Utc};
use rolodex_core::db::open_db;
use rolodex_core::model::event::{
    InteractionKind, InteractionLogged, OrganizationCreated,
};
use rolodex_core::model::relation::ExternalLink;
use rolodex_core::sync::{
    CalendarEventPatch, CalendarResult, CalendarSpi, ExternalCalendarEvent,
    SqliteSyncLinkRepository, SyncLinkRepository,
};
use rolodex_core::{
    DocumentService, EventLog, EventPayload, ReducerRegistry, SqliteEventLog, SyncEngine,
};

#[test]
fn dispatched_state_survives_reopen_with_and_without_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolodex.db");

    let (device_id, expected) = {
        let conn = open_db(&path).unwrap();
        let log = SqliteEventLog::new(&conn);
        let device_id = log.get_or_create_device_id().unwrap();

        let mut service =
            DocumentService::open(log, ReducerRegistry::core(), device_id.clone()).unwrap();
        service
            .dispatch(EventPayload::OrganizationCreated(OrganizationCreated {
                id: "org-1".to_string(),
                name: "Initech".to_string(),
            }))
            .unwrap();
        service.write_snapshot().unwrap();
        // One more event after the snapshot, so reopen replays a tail.
        service
            .dispatch(EventPayload::OrganizationCreated(OrganizationCreated {
                id: "org-2".to_string(),
                name: "Globex".to_string(),
            }))
            .unwrap();
        (device_id, service.document().clone())
    };

    let conn = open_db(&path).unwrap();
    let log = SqliteEventLog::new(&conn);
    assert_eq!(log.load_latest_device_id().unwrap(), Some(device_id.clone()));

    let service = DocumentService::open(log, ReducerRegistry::core(), device_id).unwrap();
    assert_eq!(service.document(), &expected);
    assert_eq!(service.document().organizations.len(), 2);
}

#[test]
fn rejected_dispatch_never_reaches_the_log_and_reopen_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolodex.db");

    let device_id = {
        let conn = open_db(&path).unwrap();
        let log = SqliteEventLog::new(&conn);
        let device_id = log.get_or_create_device_id().unwrap();

        let mut service =
            DocumentService::open(log, ReducerRegistry::core(), device_id.clone()).unwrap();
        let created = EventPayload::OrganizationCreated(OrganizationCreated {
            id: "org-1".to_string(),
            name: "Initech".to_string(),
        });
        service.dispatch(created.clone()).unwrap();

        // Duplicate create is rejected at the fold and must not land in
        // the durable log.
        service.dispatch(created).unwrap_err();
        assert_eq!(service.document().organizations.len(), 1);
        device_id
    };

    // Cold start replays cleanly; the rejected event left no trace.
    let conn = open_db(&path).unwrap();
    let log = SqliteEventLog::new(&conn);
    // device.registered + one organization.created.
    assert_eq!(log.load_events().unwrap().len(), 2);

    let reopened = DocumentService::open(log, ReducerRegistry::core(), device_id).unwrap();
    assert_eq!(reopened.document().organizations.len(), 1);
    assert_eq!(
        reopened.document().organizations.get("org-1").unwrap().name,
        "Initech"
    );
}

#[test]
fn sync_pass_results_can_be_adopted_and_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolodex.db");
    let conn = open_db(&path).unwrap();
    let registry = ReducerRegistry::core();

    let log = SqliteEventLog::new(&conn);
    let device_id = log.get_or_create_device_id().unwrap();
    let mut service = DocumentService::open(log, registry, device_id.clone()).unwrap();
    service
        .dispatch_event(rolodex_core::Event::recorded_at(
            EventPayload::InteractionLogged(InteractionLogged {
                id: "int-1".to_string(),
                kind: InteractionKind::Call,
                subject: "Intro call".to_string(),
                account_id: None,
                contact_id: None,
                scheduled_start: Some(t(14)),
                scheduled_end: None,
            }),
            device_id.clone(),
            t(5),
        ))
        .unwrap();

    let links = SqliteSyncLinkRepository::new(&conn);
    links
        .create_link(&ExternalLink {
            id: "link-1".to_string(),
            interaction_id: "int-1".to_string(),
            calendar_event_id: "cal-1".to_string(),
            last_synced_at: Some(t(6)),
            last_external_modified_at: Some(t(5)),
            updated_at: t(6),
        })
        .unwrap();

    // External retitle after the last pass; the engine pulls it inward.
    let calendar = OneEventCalendar {
        event: ExternalCalendarEvent {
            id: "cal-1".to_string(),
            title: "Intro call (rescheduled)".to_string(),
            start: Some(t(14)),
            end: None,
            last_modified_at: Some(t(8)),
        },
    };
    let sync_log = SqliteEventLog::new(&conn);
    let sync_registry = ReducerRegistry::core();
    let engine = SyncEngine::new(&calendar, &sync_log, &links, &sync_registry, device_id.clone());

    let (next_doc, summary) = engine.run_pass_at(service.document(), t(10));
    assert_eq!(summary.external_to_crm, 1);
    service.adopt(next_doc, summary.external_to_crm as usize);

    assert_eq!(
        service.document().interactions.get("int-1").unwrap().subject,
        "Intro call (rescheduled)"
    );

    // The adopted state is exactly what a cold reopen replays to.
    drop(service);
    let conn = open_db(&path).unwrap();
    let reopened = DocumentService::open(
        SqliteEventLog::new(&conn),
        ReducerRegistry::core(),
        device_id,
    )
    .unwrap();
    assert_eq!(
        reopened.document().interactions.get("int-1").unwrap().subject,
        "Intro call (rescheduled)"
    );
}

fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

struct OneEventCalendar {
    event: ExternalCalendarEvent,
}

impl CalendarSpi for OneEventCalendar {
    fn get_event(&self, id: &str) -> CalendarResult<Option<ExternalCalendarEvent>> {
        Ok((self.event.id == id).then(|| self.event.clone()))
    }

    fn update_event(&self, _id: &str, _patch: &CalendarEventPatch) -> CalendarResult<()> {
        Ok(())
    }
}
