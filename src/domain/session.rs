use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ParkingSession. `current_zone_id` is declared explicitly here even
/// though the source model this was distilled from never declared the
/// column it referenced at runtime (SPEC_FULL §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSession {
    pub id: i64,
    pub user_id: i64,
    pub credential_id: i64,
    pub entry_gate_id: i64,
    pub entry_time: DateTime<Utc>,
    pub current_zone_id: i64,
    pub exit_gate_id: Option<i64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub cost_cents: i64,
}

impl ParkingSession {
    pub fn is_active(&self) -> bool {
        self.exit_time.is_none()
    }
}
