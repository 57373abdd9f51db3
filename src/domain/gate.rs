use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub id: i64,
    pub name: String,
    pub zone_from_id: Option<i64>,
    pub zone_to_id: Option<i64>,
}

/// A gate's direction is derived entirely from which of its two zone
/// references are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDirection {
    /// zone_from = NULL: world -> inside.
    Entry,
    /// zone_to = NULL: inside -> world.
    Exit,
    /// both set: internal zone-to-zone transit.
    Transit,
}

impl Gate {
    pub fn direction(&self) -> GateDirection {
        match (self.zone_from_id, self.zone_to_id) {
            (None, Some(_)) => GateDirection::Entry,
            (Some(_), None) => GateDirection::Exit,
            (Some(_), Some(_)) => GateDirection::Transit,
            (None, None) => GateDirection::Transit,
        }
    }

    /// `is_entry` as published in the access_log event (SPEC_FULL §4.7):
    /// true whenever the gate leads into a zone at all (entry or transit).
    pub fn is_entry(&self) -> bool {
        self.zone_to_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(from: Option<i64>, to: Option<i64>) -> Gate {
        Gate {
            id: 1,
            name: "Main Gate".to_string(),
            zone_from_id: from,
            zone_to_id: to,
        }
    }

    #[test]
    fn entry_gate_has_no_source_zone() {
        assert_eq!(gate(None, Some(1)).direction(), GateDirection::Entry);
    }

    #[test]
    fn exit_gate_has_no_target_zone() {
        assert_eq!(gate(Some(1), None).direction(), GateDirection::Exit);
    }

    #[test]
    fn transit_gate_has_both_zones() {
        assert_eq!(gate(Some(1), Some(2)).direction(), GateDirection::Transit);
    }

    #[test]
    fn is_entry_matches_target_zone_presence() {
        assert!(gate(None, Some(1)).is_entry());
        assert!(gate(Some(1), Some(2)).is_entry());
        assert!(!gate(Some(1), None).is_entry());
    }
}
