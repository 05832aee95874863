//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `rolodex_core` linkage.
//! - Exercise the full write path once against an in-memory database.

use rolodex_core::db::open_db_in_memory;
use rolodex_core::model::event::{EventPayload, OrganizationCreated};
use rolodex_core::{DocumentService, ReducerRegistry, SqliteEventLog};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("rolodex_core ping={}", rolodex_core::ping());
    println!("rolodex_core version={}", rolodex_core::core_version());

    match smoke_round_trip() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("smoke round trip failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Opens an in-memory store, bootstraps a device identity and dispatches
/// one event end to end.
fn smoke_round_trip() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let log = SqliteEventLog::new(&conn);
    let device_id = log.get_or_create_device_id()?;

    let mut service = DocumentService::open(log, ReducerRegistry::core(), device_id)?;
    service.dispatch(EventPayload::OrganizationCreated(OrganizationCreated {
        id: "org-smoke".to_string(),
        name: "Smoke Test Org".to_string(),
    }))?;

    println!(
        "smoke document version={} entities={}",
        service.document().version,
        service.document().entity_count()
    );
    Ok(())
}
