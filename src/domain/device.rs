use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    pub kind: String,
    pub config: Option<String>,
    pub gate_id: i64,
}
