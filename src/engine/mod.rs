//! Access Decision Engine — wires the Debounce Cache, Persistence Adapter,
//! Rule Evaluator, State Transition Executor, Audit Logger, Event Emitter
//! and hardware client into the single control-flow path a scan follows.

pub mod executor;
pub mod override_path;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::audit::{self, DecisionRecord};
use crate::cache::DebounceCache;
use crate::domain::{CredentialKind, Device, Gate, ParkingSession, Subject};
use crate::errors::{DenialReason, ACCESS_GRANTED};
use crate::events::EventBus;
use crate::hardware;
use crate::persistence::PersistenceAdapter;
use crate::rules::{self, Decision};
use executor::{TransitionOutcome, TransitionRequest};

pub use override_path::trigger as trigger_manual_override;

#[derive(Clone)]
pub struct Engine {
    persistence: Arc<PersistenceAdapter>,
    debounce: Arc<DebounceCache>,
    events: EventBus,
    hardware_timeout: Duration,
}

/// What the dispatcher tells the device after a scan: `None` means stay
/// silent (debounced or unknown device); `Some` always carries a reason,
/// granted or denied.
pub struct ScanOutcome {
    pub granted: bool,
    pub reason: String,
}

impl Engine {
    pub fn new(
        persistence: Arc<PersistenceAdapter>,
        debounce: Arc<DebounceCache>,
        events: EventBus,
        hardware_timeout: Duration,
    ) -> Self {
        Self {
            persistence,
            debounce,
            events,
            hardware_timeout,
        }
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn hardware_timeout(&self) -> Duration {
        self.hardware_timeout
    }

    /// `HEARTBEAT`/`KeepAlive` frames never reach the decision pipeline:
    /// they only resolve the sending device and publish a device-status
    /// event. An unrecognized device ip is dropped with a warning, same
    /// as an unrecognized device sending a scan frame.
    pub async fn handle_heartbeat(&self, device_ip: &str) {
        match self.persistence.find_device_by_ip(device_ip) {
            Ok(Some(device)) => {
                self.events.publish_device_status(device.id, device_ip, true);
            }
            Ok(None) => {
                warn!(ip = %device_ip, "heartbeat from unrecognized device, dropping");
            }
            Err(e) => {
                warn!(error = %e, "persistence error resolving device by ip for heartbeat");
            }
        }
    }

    /// Runs one full scan through the control-flow pipeline described in
    /// the overview. Returns `None` for frames that never become an
    /// auditable decision (unknown device, debounced duplicate).
    pub async fn handle_scan(
        &self,
        device_ip: &str,
        kind: CredentialKind,
        raw_value: &str,
    ) -> Option<ScanOutcome> {
        let device = match self.persistence.find_device_by_ip(device_ip) {
            Ok(Some(d)) => d,
            Ok(None) => {
                warn!(ip = %device_ip, "scan from unrecognized device, dropping");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "persistence error resolving device by ip");
                return None;
            }
        };

        if self.debounce.check_and_record(device.gate_id, raw_value) {
            debug!(gate_id = device.gate_id, kind = %kind, "duplicate scan within debounce window, ignored");
            return None;
        }

        let gate = match self.persistence.find_gate(device.gate_id) {
            Ok(Some(g)) => g,
            Ok(None) => {
                return Some(self.deny_without_context(None, kind, raw_value, DenialReason::UnknownGate));
            }
            Err(_) => {
                return Some(self.deny_without_context(None, kind, raw_value, DenialReason::SystemError));
            }
        };

        let credential = match self.persistence.find_active_credential(kind, raw_value) {
            Ok(Some(c)) => c,
            Ok(None) => {
                return Some(self.deny(
                    &gate,
                    kind,
                    raw_value,
                    DenialReason::UnknownCredential,
                    None,
                    None,
                ));
            }
            Err(_) => {
                return Some(self.deny(&gate, kind, raw_value, DenialReason::SystemError, None, None));
            }
        };
        let (credential, subject) = credential;

        let target_zone = match gate.zone_to_id {
            Some(zid) => self.persistence.find_zone(zid).ok().flatten(),
            None => None,
        };
        let active_session = self
            .persistence
            .find_active_session(subject.user.id)
            .ok()
            .flatten();

        let rules = {
            let conn = match self.persistence.raw_conn() {
                Ok(c) => c,
                Err(_) => {
                    return Some(self.deny(
                        &gate,
                        kind,
                        raw_value,
                        DenialReason::SystemError,
                        Some(subject.user.id),
                        subject.tenant.as_ref().map(|t| t.id),
                    ));
                }
            };
            rules::applicable_rules(&conn, gate.id, gate.zone_to_id, subject.role.id)
                .unwrap_or_default()
        };

        let decision = rules::evaluate(&rules, &subject, &gate, target_zone.as_ref(), active_session.as_ref());

        match decision {
            Decision::Denied(reason) => Some(self.deny(
                &gate,
                kind,
                raw_value,
                reason,
                Some(subject.user.id),
                subject.tenant.as_ref().map(|t| t.id),
            )),
            Decision::Granted => {
                self.apply_grant(&gate, &subject, credential.id, active_session.as_ref(), kind, raw_value, &device)
                    .await
            }
        }
    }

    async fn apply_grant(
        &self,
        gate: &Gate,
        subject: &Subject,
        credential_id: i64,
        active_session: Option<&ParkingSession>,
        kind: CredentialKind,
        raw_value: &str,
        device: &Device,
    ) -> Option<ScanOutcome> {
        let outcome = {
            let mut conn = match self.persistence.raw_conn() {
                Ok(c) => c,
                Err(_) => {
                    return Some(self.deny(
                        gate,
                        kind,
                        raw_value,
                        DenialReason::SystemError,
                        Some(subject.user.id),
                        subject.tenant.as_ref().map(|t| t.id),
                    ));
                }
            };
            let req = TransitionRequest {
                gate,
                subject,
                credential_id,
                active_session,
            };
            executor::execute(&mut conn, &req, Utc::now())
        };

        match outcome {
            Ok(TransitionOutcome::CapacityExceeded) => Some(self.deny(
                gate,
                kind,
                raw_value,
                DenialReason::ZoneFull,
                Some(subject.user.id),
                subject.tenant.as_ref().map(|t| t.id),
            )),
            Err(_) => Some(self.deny(
                gate,
                kind,
                raw_value,
                DenialReason::SystemError,
                Some(subject.user.id),
                subject.tenant.as_ref().map(|t| t.id),
            )),
            Ok(TransitionOutcome::Applied) => {
                let log_id = audit::record(
                    &self.persistence,
                    &DecisionRecord {
                        gate_id: Some(gate.id),
                        gate_name_snapshot: &gate.name,
                        scan_kind: kind,
                        raw_payload: raw_value,
                        granted: true,
                        denial_reason: ACCESS_GRANTED,
                        resolved_user_id: Some(subject.user.id),
                        resolved_tenant_id: subject.tenant.as_ref().map(|t| t.id),
                    },
                );

                if let Ok(log_id) = log_id {
                    self.emit_access_log(log_id, Some(gate), Some(&subject.user.full_name()));
                }
                if let Some(zone_id) = gate.zone_to_id {
                    self.emit_occupancy(zone_id);
                }
                if let Some(zone_id) = gate.zone_from_id {
                    self.emit_occupancy(zone_id);
                }

                let timeout = self.hardware_timeout;
                let ip = device.ip_address.clone();
                let port = device.port;
                if hardware::send_open_command(&ip, port, timeout).await.is_err() {
                    // Policy: hardware failure does not roll back the decision.
                    warn!(device = %ip, "open command failed; authorization stands");
                }

                Some(ScanOutcome {
                    granted: true,
                    reason: ACCESS_GRANTED.to_string(),
                })
            }
        }
    }

    fn deny(
        &self,
        gate: &Gate,
        kind: CredentialKind,
        raw_value: &str,
        reason: DenialReason,
        resolved_user_id: Option<i64>,
        resolved_tenant_id: Option<i64>,
    ) -> ScanOutcome {
        let log_id = audit::record(
            &self.persistence,
            &DecisionRecord {
                gate_id: Some(gate.id),
                gate_name_snapshot: &gate.name,
                scan_kind: kind,
                raw_payload: raw_value,
                granted: false,
                denial_reason: reason.as_str(),
                resolved_user_id,
                resolved_tenant_id,
            },
        );
        if let Ok(log_id) = log_id {
            self.emit_access_log(log_id, Some(gate), None);
        }
        ScanOutcome {
            granted: false,
            reason: reason.as_str().to_string(),
        }
    }

    /// Denial path for frames that never resolved to a gate at all
    /// (gate row missing for an otherwise-known device).
    fn deny_without_context(
        &self,
        gate_id: Option<i64>,
        kind: CredentialKind,
        raw_value: &str,
        reason: DenialReason,
    ) -> ScanOutcome {
        let log_id = audit::record(
            &self.persistence,
            &DecisionRecord {
                gate_id,
                gate_name_snapshot: "UNKNOWN",
                scan_kind: kind,
                raw_payload: raw_value,
                granted: false,
                denial_reason: reason.as_str(),
                resolved_user_id: None,
                resolved_tenant_id: None,
            },
        );
        if let Ok(log_id) = log_id {
            self.emit_access_log(log_id, None, None);
        }
        ScanOutcome {
            granted: false,
            reason: reason.as_str().to_string(),
        }
    }

    fn emit_access_log(&self, log_id: i64, gate: Option<&Gate>, user_name: Option<&str>) {
        if let Ok(Some(log)) = self.persistence.find_scan_log_by_id(log_id) {
            self.events.publish_access_log(&log, gate, user_name);
        }
    }

    fn emit_occupancy(&self, zone_id: i64) {
        if let Ok(Some(zone)) = self.persistence.find_zone(zone_id) {
            self.events.publish_occupancy_update(&zone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tokio::net::TcpListener;

    async fn engine_with_device() -> (Engine, std::net::SocketAddr) {
        let pool = db::open_pool(":memory:").unwrap();
        let persistence = Arc::new(PersistenceAdapter::new(pool));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });

        {
            let conn = persistence.raw_conn().unwrap();
            conn.execute_batch(&format!(
                "INSERT INTO roles (id, name) VALUES (1, 'Guest');
                 INSERT INTO users (id, first_name, last_name, role_id) VALUES (1, 'Jane', 'Doe', 1);
                 INSERT INTO credentials (id, user_id, kind, value) VALUES (1, 1, 'RFID', 'E1');
                 INSERT INTO zones (id, name, capacity, occupancy) VALUES (1, 'Lot', 10, 0);
                 INSERT INTO gates (id, name, zone_from_id, zone_to_id) VALUES (1, 'Main', NULL, 1);
                 INSERT INTO devices (id, name, ip_address, port, kind, gate_id)
                     VALUES (1, 'ctrl', '{}', {}, 'relay', 1);
                 INSERT INTO validation_rules (scope, kind, enabled) VALUES ('GLOBAL', 'CAPACITY', 1);",
                addr.ip(),
                addr.port()
            ))
            .unwrap();
        }

        let engine = Engine::new(
            persistence,
            Arc::new(DebounceCache::new(Duration::from_secs(20))),
            EventBus::new(),
            Duration::from_secs(2),
        );
        (engine, addr)
    }

    #[tokio::test]
    async fn unknown_device_produces_no_outcome() {
        let (engine, _addr) = engine_with_device().await;
        let outcome = engine
            .handle_scan("10.99.99.99", CredentialKind::Rfid, "E1")
            .await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn grants_access_for_known_credential_in_empty_zone() {
        let (engine, addr) = engine_with_device().await;
        let outcome = engine
            .handle_scan(&addr.ip().to_string(), CredentialKind::Rfid, "E1")
            .await
            .unwrap();
        assert!(outcome.granted);
        assert_eq!(outcome.reason, ACCESS_GRANTED);
    }

    #[tokio::test]
    async fn unknown_credential_is_denied_and_audited() {
        let (engine, addr) = engine_with_device().await;
        let outcome = engine
            .handle_scan(&addr.ip().to_string(), CredentialKind::Rfid, "NOT-IN-DB")
            .await
            .unwrap();
        assert!(!outcome.granted);
        assert_eq!(outcome.reason, "UNKNOWN_CREDENTIAL");
        let logs = engine.persistence().recent_scan_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn heartbeat_from_known_device_publishes_online_status() {
        let (engine, addr) = engine_with_device().await;
        let mut rx = engine.events().subscribe();
        engine.handle_heartbeat(&addr.ip().to_string()).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event["type"], "device_status");
        assert_eq!(event["data"]["online"], true);
    }

    #[tokio::test]
    async fn heartbeat_from_unknown_device_publishes_nothing() {
        let (engine, _addr) = engine_with_device().await;
        let mut rx = engine.events().subscribe();
        engine.handle_heartbeat("10.99.99.99").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_scan_within_debounce_window_is_dropped() {
        let (engine, addr) = engine_with_device().await;
        let ip = addr.ip().to_string();
        let first = engine.handle_scan(&ip, CredentialKind::Rfid, "E1").await;
        assert!(first.is_some());
        let second = engine.handle_scan(&ip, CredentialKind::Rfid, "E1").await;
        assert!(second.is_none());
        let logs = engine.persistence().recent_scan_logs(10).unwrap();
        assert_eq!(logs.len(), 1, "the debounced scan must not be audited");
    }
}
