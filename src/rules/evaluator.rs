//! Rule Evaluator — pure function, no I/O. Every input is already resolved
//! by the Persistence Adapter; this module only makes the allow/deny call.

use crate::domain::{Gate, GateDirection, RuleKind, RuleScope, Subject, ValidationRule, Zone};
use crate::errors::DenialReason;
use crate::domain::ParkingSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied(DenialReason),
}

/// `target_zone` is the zone the subject would end up in (`gate.zone_to_id`);
/// `source_zone` is the zone they are leaving (`gate.zone_from_id`). Either
/// may be absent depending on gate direction.
pub fn evaluate(
    rules: &[ValidationRule],
    subject: &Subject,
    gate: &Gate,
    target_zone: Option<&Zone>,
    active_session: Option<&ParkingSession>,
) -> Decision {
    if !subject.user.active {
        return Decision::Denied(DenialReason::UserInactive);
    }

    let mut ordered: Vec<&ValidationRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.kind.priority());

    for rule in ordered {
        if let Some(reason) = evaluate_one(rule, subject, gate, target_zone, active_session) {
            return Decision::Denied(reason);
        }
    }

    Decision::Granted
}

fn evaluate_one(
    rule: &ValidationRule,
    subject: &Subject,
    gate: &Gate,
    target_zone: Option<&Zone>,
    active_session: Option<&ParkingSession>,
) -> Option<DenialReason> {
    let role = &subject.role;

    match rule.kind {
        RuleKind::Capacity => {
            if role.may_ignore_capacity {
                return None;
            }
            if let Some(zone) = target_zone {
                if zone.occupancy >= zone.capacity {
                    return Some(DenialReason::ZoneFull);
                }
            }
            if let Some(tenant) = &subject.tenant {
                if rule.target.scope() != RuleScope::Zone
                    && tenant.current_usage >= tenant.quota_limit
                {
                    return Some(DenialReason::TenantQuotaExceeded);
                }
            }
            None
        }
        RuleKind::Antipassback => {
            if role.may_ignore_antipassback {
                return None;
            }
            match gate.direction() {
                GateDirection::Entry => {
                    if active_session.is_some() {
                        Some(DenialReason::AlreadyInside)
                    } else {
                        None
                    }
                }
                GateDirection::Exit => {
                    if active_session.is_none() {
                        Some(DenialReason::NoEntryRecord)
                    } else {
                        None
                    }
                }
                GateDirection::Transit => match active_session {
                    None => Some(DenialReason::ApbViolationWrongZone),
                    Some(session) => {
                        if Some(session.current_zone_id) != gate.zone_from_id {
                            Some(DenialReason::ApbViolationWrongZone)
                        } else {
                            None
                        }
                    }
                },
            }
        }
        RuleKind::Schedule => {
            // Reserved: no schedule data modeled yet. `may_ignore_schedule`
            // still gates whether a future schedule check would apply.
            None
        }
        RuleKind::Payment => {
            // Reserved: no tariff computation yet.
            None
        }
        RuleKind::Blacklist => {
            if role.is_blacklisted() {
                Some(DenialReason::Blacklisted)
            } else {
                None
            }
        }
    }
}
