use serde::{Deserialize, Serialize};

/// A role grants a set of independent override flags to every user holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub may_ignore_capacity: bool,
    pub may_ignore_antipassback: bool,
    pub may_ignore_schedule: bool,
    pub is_billable: bool,
}

impl Role {
    /// The open-question resolution for BLACKLIST: a role named "Blacklisted"
    /// (case-insensitive) is treated as an unconditional deny marker.
    pub fn is_blacklisted(&self) -> bool {
        self.name.eq_ignore_ascii_case("blacklisted")
    }
}
