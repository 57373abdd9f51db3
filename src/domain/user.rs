use super::{Role, Tenant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role_id: i64,
    pub tenant_id: Option<i64>,
    pub active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A user plus its eagerly-loaded role and (optional) tenant, as resolved
/// by the persistence adapter for a single scan decision.
#[derive(Debug, Clone)]
pub struct Subject {
    pub user: User,
    pub role: Role,
    pub tenant: Option<Tenant>,
}
