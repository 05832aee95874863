//! Device family reducer.

use crate::doc::Document;
use crate::model::entity::Device;
use crate::model::event::{Event, EventPayload};
use crate::reduce::{ReduceError, ReduceResult};
use std::sync::Arc;

pub(super) fn apply(doc: &mut Document, event: &Event) -> ReduceResult<()> {
    match &event.payload {
        EventPayload::DeviceRegistered(payload) => {
            if doc.devices.contains_key(&payload.device_id) {
                return Err(ReduceError::DuplicateEntity {
                    kind: "device",
                    id: payload.device_id.clone(),
                });
            }
            Arc::make_mut(&mut doc.devices).insert(
                payload.device_id.clone(),
                Device {
                    id: payload.device_id.clone(),
                    platform: payload.platform.clone(),
                    registered_at: event.timestamp,
                },
            );
            Ok(())
        }
        other => Err(ReduceError::UnhandledEventType {
            family: other.family(),
            event_type: other.kind(),
        }),
    }
}
