//! Note family reducer.

use crate::doc::Document;
use crate::model::entity::Note;
use crate::model::event::{Event, EventPayload};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::NoteCreated(payload) => {
            if doc.notes.contains_key(&payload.id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "note",
                    id: payload.id.clone(),
                });
            }
            Arc::make_mut(&mut doc.notes).insert(
                payload.id.clone(),
                Note {
                    id: payload.id.clone(),
                    body: payload.body.clone(),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
            Ok(())
        }
        EventPayload::NoteUpdated(payload) => {
            let notes = Arc::make_mut(&mut doc.notes);
            let note = notes
                .get_mut(&payload.id)
                .ok_or_else(|| ReduceError::EntityNotFound {
                    kind: "note",
                    id: payload.id.clone(),
                })?;
            note.body = payload.body.clone();
            note.updated_at = event.timestamp;
            Ok(())
        }
        EventPayload::NoteDeleted(payload) => {
            if Arc::make_mut(&mut doc.notes).remove(&payload.id).is_none() {
                return Err(ReduceError::EntityNotFound {
                    kind: "note",
                    id: payload.id.clone(),
                });
            }
            Ok(())
        }
        other => Err(ReduceError::UnhandledEventType {
            family: other.family(),
            event_type: other.kind(),
        }),
    }
}
