//! Event log contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide durable, ordered, exactly-as-given event append.
//! - Rehydrate the document by replaying the log from the empty document,
//!   optionally accelerated by the snapshot cache.
//!
//! # Invariants
//! - Append preserves the caller's array order and commits atomically.
//! - Snapshot-accelerated load is semantically equal to full replay.

use crate::doc::Document;
use crate::model::event::Event;
use crate::reduce::ReducerRegistry;
use crate::store::{StoreError, StoreResult};
use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Instant;

/// Result of a cold-start load: the rehydrated document plus the full log.
#[derive(Debug)]
pub struct PersistedState {
    pub doc: Document,
    pub events: Vec<Event>,
    /// Sequence number of the last event in the log; feeds `write_snapshot`.
    pub last_seq: i64,
}

/// Persistence contract for the append-only event log.
pub trait EventLog {
    /// Durable ordered append. Must not reorder or deduplicate; the batch
    /// commits atomically or not at all.
    fn append_events(&self, events: &[Event]) -> StoreResult<()>;

    /// Reads the full log in insertion order.
    fn load_events(&self) -> StoreResult<Vec<Event>>;

    /// Rehydrates `{doc, events}` by folding the log from the empty
    /// document, reusing the snapshot cache for the prefix when present.
    fn load_persisted_state(&self, registry: &ReducerRegistry) -> StoreResult<PersistedState>;

    /// Persists the snapshot cache for the log prefix up to `through_seq`.
    fn write_snapshot(&self, doc: &Document, through_seq: i64) -> StoreResult<()>;
}

/// SQLite-backed event log.
pub struct SqliteEventLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventLog<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub(super) fn connection(&self) -> &Connection {
        self.conn
    }

    fn load_events_after(&self, seq: i64) -> StoreResult<Vec<(i64, Event)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, body FROM events WHERE seq > ?1 ORDER BY seq ASC;")?;
        let mut rows = stmt.query(params![seq])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let row_seq: i64 = row.get(0)?;
            let body: String = row.get(1)?;
            let event = serde_json::from_str::<Event>(&body).map_err(|err| {
                StoreError::InvalidData(format!("event at seq {row_seq} failed to decode: {err}"))
            })?;
            events.push((row_seq, event));
        }
        Ok(events)
    }

    fn load_snapshot(&self) -> StoreResult<Option<(i64, Document)>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT through_seq, doc FROM snapshots WHERE id = 1;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((through_seq, doc_json)) => {
                let doc = serde_json::from_str::<Document>(&doc_json).map_err(|err| {
                    StoreError::InvalidData(format!(
                        "snapshot at seq {through_seq} failed to decode: {err}"
                    ))
                })?;
                Ok(Some((through_seq, doc)))
            }
            None => Ok(None),
        }
    }
}

impl EventLog for SqliteEventLog<'_> {
    fn append_events(&self, events: &[Event]) -> StoreResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO events (id, type, entity_id, timestamp, device_id, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for event in events {
                let body = serde_json::to_string(event).map_err(|err| {
                    StoreError::InvalidData(format!(
                        "event {} failed to encode: {err}",
                        event.id
                    ))
                })?;
                stmt.execute(params![
                    event.id.to_string(),
                    event.payload.kind(),
                    event.entity_id.as_deref(),
                    event.timestamp.to_rfc3339(),
                    event.device_id.as_str(),
                    body,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            "event=log_append module=store status=ok count={} duration_ms={}",
            events.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn load_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self
            .load_events_after(0)?
            .into_iter()
            .map(|(_, event)| event)
            .collect())
    }

    fn load_persisted_state(&self, registry: &ReducerRegistry) -> StoreResult<PersistedState> {
        let started_at = Instant::now();
        let snapshot = self.load_snapshot()?;
        let rows = self.load_events_after(0)?;
        let last_seq = rows.last().map_or(0, |(seq, _)| *seq);

        // A snapshot ahead of the log means the log was truncated behind
        // our back; fall back to full replay rather than trust it.
        let (base_doc, base_seq, from_snapshot) = match snapshot {
            Some((through_seq, doc)) if through_seq <= last_seq => (doc, through_seq, true),
            _ => (Document::init(), 0, false),
        };

        let mut doc = base_doc;
        for (_, event) in rows.iter().filter(|(seq, _)| *seq > base_seq) {
            doc = registry
                .fold(&doc, std::slice::from_ref(event))
                .map_err(|source| StoreError::Replay {
                    event_id: event.id,
                    source,
                })?;
        }

        info!(
            "event=log_replay module=store status=ok events={} snapshot={} duration_ms={}",
            rows.len(),
            from_snapshot,
            started_at.elapsed().as_millis()
        );

        Ok(PersistedState {
            doc,
            events: rows.into_iter().map(|(_, event)| event).collect(),
            last_seq,
        })
    }

    fn write_snapshot(&self, doc: &Document, through_seq: i64) -> StoreResult<()> {
        let doc_json = serde_json::to_string(doc)
            .map_err(|err| StoreError::InvalidData(format!("snapshot failed to encode: {err}")))?;
        self.conn.execute(
            "INSERT INTO snapshots (id, through_seq, doc, created_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                through_seq = excluded.through_seq,
                doc = excluded.doc,
                created_at = excluded.created_at;",
            params![through_seq, doc_json, Utc::now().to_rfc3339()],
        )?;

        info!(
            "event=snapshot_write module=store status=ok through_seq={through_seq} version={}",
            doc.version
        );
        Ok(())
    }
}
