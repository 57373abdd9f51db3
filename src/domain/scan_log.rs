use super::CredentialKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit row. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLog {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub gate_id: Option<i64>,
    pub gate_name_snapshot: String,
    pub scan_kind: CredentialKind,
    pub raw_payload: String,
    pub granted: bool,
    pub denial_reason: String,
    pub resolved_user_id: Option<i64>,
    pub resolved_tenant_id: Option<i64>,
}
