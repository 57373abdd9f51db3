//! Event Emitter — publish-only live feed.
//!
//! Simpler than the gateway's bidirectional OC-protocol WebSocket
//! (`gateway/websocket.rs`): there is no handshake, no request/response
//! correlation, just a broadcast channel that the admin HTTP surface's
//! `/api/ws` handler relays verbatim to every connected subscriber.

use crate::domain::{Gate, ScanLog, Zone};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Value>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }

    fn publish(&self, event_type: &str, payload: Value) {
        let envelope = serde_json::json!({ "type": event_type, "data": payload });
        // No subscribers is the common case (no dashboard open); dropping
        // the event is correct, not an error.
        let _ = self.tx.send(envelope);
    }

    /// Mirrors `_emit_access_log`: the audit row's fields plus a
    /// human-readable user name and the gate's `is_entry` flag.
    pub fn publish_access_log(
        &self,
        log: &ScanLog,
        gate: Option<&Gate>,
        user_name: Option<&str>,
    ) {
        self.publish(
            "access_log",
            serde_json::json!({
                "id": log.id,
                "created_at": log.created_at,
                "gate_id": log.gate_id,
                "gate_name": log.gate_name_snapshot,
                "scan_kind": log.scan_kind.as_str(),
                "raw_payload": log.raw_payload,
                "granted": log.granted,
                "denial_reason": log.denial_reason,
                "status": status_for(&log.denial_reason),
                "user_name": user_name,
                "is_entry": gate.map(Gate::is_entry),
            }),
        );
    }

    pub fn publish_occupancy_update(&self, zone: &Zone) {
        self.publish(
            "occupancy_update",
            serde_json::json!({
                "zone_id": zone.id,
                "name": zone.name,
                "occupancy": zone.occupancy,
                "capacity": zone.capacity,
                "percent_full": zone.percent_full(),
            }),
        );
    }

    pub fn publish_device_status(&self, device_id: i64, ip_address: &str, online: bool) {
        self.publish(
            "device_status",
            serde_json::json!({
                "device_id": device_id,
                "ip_address": ip_address,
                "online": online,
            }),
        );
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a decision outcome to the JSON status string the dashboard
/// expects alongside the reason code.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessStatus {
    Allowed,
    Denied,
}

pub fn status_for(reason: &str) -> AccessStatus {
    if reason == crate::errors::ACCESS_GRANTED {
        AccessStatus::Allowed
    } else {
        AccessStatus::Denied
    }
}
