use rolodex_core::db::{open_db, open_db_in_memory};
use rolodex_core::{EventLog, ReducerRegistry, SqliteEventLog};
use uuid::Uuid;

#[test]
fn first_run_synthesizes_and_registers_a_device_id() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);

    assert_eq!(log.load_latest_device_id().unwrap(), None);

    let device_id = log.get_or_create_device_id().unwrap();
    Uuid::parse_str(&device_id).expect("device id should be a uuid");

    // The registration event and the meta row land together.
    let events = log.load_events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload.kind(), "device.registered");
    assert_eq!(events[0].device_id, device_id);
    assert_eq!(log.load_latest_device_id().unwrap(), Some(device_id));
}

#[test]
fn bootstrap_is_idempotent_within_a_session() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);

    let first = log.get_or_create_device_id().unwrap();
    let second = log.get_or_create_device_id().unwrap();

    assert_eq!(first, second);
    assert_eq!(log.load_events().unwrap().len(), 1);
}

#[test]
fn bootstrap_is_stable_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolodex.db");

    let first = {
        let conn = open_db(&path).unwrap();
        SqliteEventLog::new(&conn).get_or_create_device_id().unwrap()
    };

    let conn = open_db(&path).unwrap();
    let log = SqliteEventLog::new(&conn);
    let second = log.get_or_create_device_id().unwrap();

    assert_eq!(first, second);
    assert_eq!(log.load_events().unwrap().len(), 1);
}

#[test]
fn registration_event_replays_into_the_device_map() {
    let conn = open_db_in_memory().unwrap();
    let log = SqliteEventLog::new(&conn);
    let device_id = log.get_or_create_device_id().unwrap();

    let state = log.load_persisted_state(&ReducerRegistry::core()).unwrap();

    let device = state.doc.devices.get(&device_id).unwrap();
    assert_eq!(device.id, device_id);
    assert!(device.platform.is_some());
}
