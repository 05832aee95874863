use rolodex_core::db::{open_db, open_db_in_memory};
use rolodex_core::model::event::{AccountCreated, OrganizationCreated, OrganizationUpdated};
use rolodex_core::{
    Document, Event, EventLog, EventPayload, ReducerRegistry, SqliteEventLog, StoreError,
};

#[test]
fn append_preserves_order_and_content() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);
    let events = sample_events();

    log.append_events(&events).unwrap();

    let loaded = log.load_events().unwrap();
    assert_eq!(loaded, events);
}

#[test]
fn reopened_database_replays_to_equal_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolodex.db");
    let registry = ReducerRegistry::core();
    let events = sample_events();
    let expected = registry.fold(&Document::init(), &events).unwrap();

    {
        let conn = open_db(&path).unwrap();
        let log = SqliteEventLog::new(&conn);
        log.append_events(&events).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let log = SqliteEventLog::new(&conn);
    let state = log.load_persisted_state(&registry).unwrap();

    assert_eq!(state.doc, expected);
    assert_eq!(state.events, events);
    assert_eq!(state.last_seq, events.len() as i64);
}

#[test]
fn snapshot_accelerated_load_equals_full_replay() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);
    let registry = ReducerRegistry::core();
    let events = sample_events();

    // Snapshot midway, then append the tail after it.
    log.append_events(&events[..2]).unwrap();
    let midway = log.load_persisted_state(&registry).unwrap();
    log.write_snapshot(&midway.doc, midway.last_seq).unwrap();
    log.append_events(&events[2..]).unwrap();

    let state = log.load_persisted_state(&registry).unwrap();
    let expected = registry.fold(&Document::init(), &events).unwrap();

    assert_eq!(state.doc, expected);
    assert_eq!(state.last_seq, events.len() as i64);
}

#[test]
fn snapshot_ahead_of_log_falls_back_to_full_replay() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);
    let registry = ReducerRegistry::core();
    let events = sample_events();

    log.append_events(&events).unwrap();
    let state = log.load_persisted_state(&registry).unwrap();
    // Claim the snapshot covers events that are not in the log.
    log.write_snapshot(&state.doc, state.last_seq + 10).unwrap();

    let reloaded = log.load_persisted_state(&registry).unwrap();
    assert_eq!(reloaded.doc, state.doc);
}

#[test]
fn corrupt_log_surfaces_replay_error() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);
    let registry = ReducerRegistry::core();

    // Same create twice is valid to append (the log is not validating) but
    // must fail deterministically at replay.
    let create = Event::record(org_created("org-1", "Initech"), "device-1");
    let dup = Event::record(org_created("org-1", "Initech"), "device-1");
    log.append_events(&[create, dup.clone()]).unwrap();

    let err = log.load_persisted_state(&registry).unwrap_err();
    match err {
        StoreError::Replay { event_id, .. } => assert_eq!(event_id, dup.id),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_append_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);

    log.append_events(&[]).unwrap();

    assert!(log.load_events().unwrap().is_empty());
}

fn org_created(id: &str, name: &str) -> EventPayload {
    EventPayload::OrganizationCreated(OrganizationCreated {
        id: id.to_string(),
        name: name.to_string(),
    })
}

fn sample_events() -> Vec<Event> {
    vec![
        Event::record(org_created("org-1", "Initech"), "device-1"),
        Event::record(
            EventPayload::AccountCreated(AccountCreated {
                id: "acct-1".to_string(),
                name: "Initech Ops".to_string(),
                organization_id: Some("org-1".to_string()),
            }),
            "device-1",
        ),
        Event::record(
            EventPayload::OrganizationUpdated(OrganizationUpdated {
                id: "org-1".to_string(),
                name: Some("Initech Global".to_string()),
            }),
            "device-1",
        ),
    ]
}
