use serde::{Deserialize, Serialize};

/// Rule scope, expressed as a tagged target rather than four parallel
/// nullable foreign keys (SPEC_FULL §9) — the "exactly one target when
/// scope != GLOBAL" invariant becomes structural instead of a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTarget {
    Global,
    Zone(i64),
    Gate(i64),
    Role(i64),
}

impl RuleTarget {
    pub fn scope(&self) -> RuleScope {
        match self {
            RuleTarget::Global => RuleScope::Global,
            RuleTarget::Zone(_) => RuleScope::Zone,
            RuleTarget::Gate(_) => RuleScope::Gate,
            RuleTarget::Role(_) => RuleScope::Role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleScope {
    Global,
    Zone,
    Gate,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    Capacity,
    Antipassback,
    Schedule,
    Payment,
    Blacklist,
}

impl RuleKind {
    /// Fixed evaluation priority pinned by SPEC_FULL §4.4/§9, independent of
    /// fetch order: CAPACITY < ANTIPASSBACK < SCHEDULE < PAYMENT < BLACKLIST.
    pub fn priority(&self) -> u8 {
        match self {
            RuleKind::Capacity => 0,
            RuleKind::Antipassback => 1,
            RuleKind::Schedule => 2,
            RuleKind::Payment => 3,
            RuleKind::Blacklist => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Capacity => "CAPACITY",
            RuleKind::Antipassback => "ANTIPASSBACK",
            RuleKind::Schedule => "SCHEDULE",
            RuleKind::Payment => "PAYMENT",
            RuleKind::Blacklist => "BLACKLIST",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: i64,
    pub target: RuleTarget,
    pub kind: RuleKind,
    pub enabled: bool,
    pub params: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_capacity_before_antipassback() {
        assert!(RuleKind::Capacity.priority() < RuleKind::Antipassback.priority());
    }

    #[test]
    fn priority_is_strictly_increasing_in_declared_order() {
        let order = [
            RuleKind::Capacity,
            RuleKind::Antipassback,
            RuleKind::Schedule,
            RuleKind::Payment,
            RuleKind::Blacklist,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
        }
    }

    #[test]
    fn target_scope_matches_variant() {
        assert_eq!(RuleTarget::Global.scope(), RuleScope::Global);
        assert_eq!(RuleTarget::Zone(5).scope(), RuleScope::Zone);
        assert_eq!(RuleTarget::Gate(5).scope(), RuleScope::Gate);
        assert_eq!(RuleTarget::Role(5).scope(), RuleScope::Role);
    }
}
