//! Device-identity bootstrap.
//!
//! # Responsibility
//! - Resolve the stable per-installation writer id.
//! - Register a brand-new device in the event log on first run.
//!
//! # Invariants
//! - The `meta('device.id')` row and the `device.registered` event are
//!   written in one transaction, so a crash-and-retry either observes both
//!   or neither; a second run never re-synthesizes the id.
//! - A bootstrap failure means no writer identity exists and no event can
//!   be safely emitted; callers must treat it as fatal to initialization.

use crate::model::event::{DeviceRegistered, Event, EventPayload};
use crate::store::event_log::SqliteEventLog;
use crate::store::{StoreError, StoreResult};
use log::info;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

const DEVICE_ID_KEY: &str = "device.id";

impl SqliteEventLog<'_> {
    /// Returns the persisted device id without creating one.
    pub fn load_latest_device_id(&self) -> StoreResult<Option<String>> {
        let value: Option<String> = self
            .connection()
            .query_row(
                "SELECT value FROM meta WHERE key = ?1;",
                params![DEVICE_ID_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Resolves the stable per-installation device id, synthesizing and
    /// registering one on first run.
    pub fn get_or_create_device_id(&self) -> StoreResult<String> {
        if let Some(existing) = self.load_latest_device_id()? {
            return Ok(existing);
        }

        let device_id = Uuid::new_v4().to_string();
        let event = Event::record(
            EventPayload::DeviceRegistered(DeviceRegistered {
                device_id: device_id.clone(),
                platform: Some(std::env::consts::OS.to_string()),
            }),
            device_id.clone(),
        );
        let body = serde_json::to_string(&event).map_err(|err| {
            StoreError::InvalidData(format!("device event failed to encode: {err}"))
        })?;

        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO events (id, type, entity_id, timestamp, device_id, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.id.to_string(),
                event.payload.kind(),
                event.entity_id.as_deref(),
                event.timestamp.to_rfc3339(),
                event.device_id.as_str(),
                body,
            ],
        )?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2);",
            params![DEVICE_ID_KEY, device_id.as_str()],
        )?;
        tx.commit()?;

        info!("event=device_bootstrap module=store status=ok device_id={device_id}");
        Ok(device_id)
    }
}
