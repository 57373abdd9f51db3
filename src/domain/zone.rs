use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    pub occupancy: i64,
    pub parent_zone_id: Option<i64>,
}

impl Zone {
    pub fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }

    pub fn percent_full(&self) -> f64 {
        if self.capacity > 0 {
            ((self.occupancy as f64 / self.capacity as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        }
    }
}
