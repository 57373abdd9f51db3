//! Audit Logger — writes the one ScanLog row every concluded decision
//! produces (debounced and unknown-device frames never reach here).

use crate::domain::CredentialKind;
use crate::errors::PersistenceError;
use crate::persistence::{NewScanLog, PersistenceAdapter};
use chrono::Utc;

pub struct DecisionRecord<'a> {
    pub gate_id: Option<i64>,
    pub gate_name_snapshot: &'a str,
    pub scan_kind: CredentialKind,
    pub raw_payload: &'a str,
    pub granted: bool,
    pub denial_reason: &'a str,
    pub resolved_user_id: Option<i64>,
    pub resolved_tenant_id: Option<i64>,
}

pub fn record(
    persistence: &PersistenceAdapter,
    decision: &DecisionRecord<'_>,
) -> Result<i64, PersistenceError> {
    persistence.record_scan_log(&NewScanLog {
        created_at: Utc::now(),
        gate_id: decision.gate_id,
        gate_name_snapshot: decision.gate_name_snapshot.to_string(),
        scan_kind: decision.scan_kind,
        raw_payload: decision.raw_payload.to_string(),
        granted: decision.granted,
        denial_reason: decision.denial_reason.to_string(),
        resolved_user_id: decision.resolved_user_id,
        resolved_tenant_id: decision.resolved_tenant_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn records_a_denial_with_no_resolved_user() {
        let pool = db::open_pool(":memory:").unwrap();
        let adapter = PersistenceAdapter::new(pool);
        let id = record(
            &adapter,
            &DecisionRecord {
                gate_id: None,
                gate_name_snapshot: "UNKNOWN",
                scan_kind: CredentialKind::Rfid,
                raw_payload: "NOT-IN-DB",
                granted: false,
                denial_reason: "UNKNOWN_CREDENTIAL",
                resolved_user_id: None,
                resolved_tenant_id: None,
            },
        )
        .unwrap();
        assert!(id > 0);
        let logs = adapter.recent_scan_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].resolved_user_id.is_none());
    }
}
