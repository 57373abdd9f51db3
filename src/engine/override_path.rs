//! Manual Override — operator-triggered force-open, bypassing the
//! evaluator entirely. Purely observational: no occupancy or session
//! mutation, by contract.

use std::time::Duration;

use crate::audit::{self, DecisionRecord};
use crate::domain::CredentialKind;
use crate::errors::{EngineError, PersistenceError, MANUAL_OPEN_DASHBOARD};
use crate::events::EventBus;
use crate::hardware;
use crate::persistence::PersistenceAdapter;

pub async fn trigger(
    persistence: &PersistenceAdapter,
    events: &EventBus,
    hardware_timeout: Duration,
    gate_id: i64,
) -> Result<(), EngineError> {
    let device = persistence
        .find_device_for_gate(gate_id)?
        .ok_or(EngineError::NoControllerForGate)?;
    let gate = persistence
        .find_gate(gate_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("gate {gate_id}")))?;

    hardware::send_open_command(&device.ip_address, device.port, hardware_timeout)
        .await
        .map_err(|e| EngineError::HardwareCommand(e.to_string()))?;

    let log_id = audit::record(
        persistence,
        &DecisionRecord {
            gate_id: Some(gate.id),
            gate_name_snapshot: &gate.name,
            scan_kind: CredentialKind::Pin,
            raw_payload: "MANUAL_OVERRIDE",
            granted: true,
            denial_reason: MANUAL_OPEN_DASHBOARD,
            resolved_user_id: None,
            resolved_tenant_id: None,
        },
    )?;

    if let Some(log) = persistence.find_scan_log_by_id(log_id)? {
        events.publish_access_log(&log, Some(&gate), None);
    }

    Ok(())
}
