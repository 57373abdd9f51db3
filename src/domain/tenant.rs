use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub quota_limit: i64,
    pub current_usage: i64,
    pub active: bool,
}

impl Tenant {
    pub fn quota_exceeded(&self) -> bool {
        self.current_usage >= self.quota_limit
    }
}
