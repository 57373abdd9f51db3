//! State Transition Executor — the only code in this crate that mutates
//! occupancy, tenant usage, or session rows.
//!
//! SQLite has no `SELECT ... FOR UPDATE`; `BEGIN IMMEDIATE` takes the
//! reserved write lock for the whole connection up front, which gives the
//! same serialization guarantee a real row lock would for this workload
//! (at most one writer transaction touches the schema at a time). The reads
//! below still happen in the fixed zone-id-ascending, then-tenant,
//! then-session order the row-lock contract calls for, so the mandatory
//! capacity re-check and the eventual mutations are grounded on a
//! consistent snapshot taken in that order.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::domain::{Gate, GateDirection, ParkingSession, Subject};
use crate::errors::EngineError;

pub struct TransitionRequest<'a> {
    pub gate: &'a Gate,
    pub subject: &'a Subject,
    pub credential_id: i64,
    pub active_session: Option<&'a ParkingSession>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    CapacityExceeded,
}

pub fn execute(
    conn: &mut Connection,
    req: &TransitionRequest<'_>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, EngineError> {
    let direction = match (req.gate.zone_from_id, req.gate.zone_to_id) {
        (None, None) => return Err(EngineError::InvalidGate(req.gate.id)),
        _ => req.gate.direction(),
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut zone_ids: Vec<i64> = [req.gate.zone_from_id, req.gate.zone_to_id]
        .into_iter()
        .flatten()
        .collect();
    zone_ids.sort_unstable();
    zone_ids.dedup();

    let mut zone_occupancy = std::collections::HashMap::new();
    for zone_id in &zone_ids {
        let (occupancy, capacity): (i64, i64) = tx.query_row(
            "SELECT occupancy, capacity FROM zones WHERE id = ?1",
            params![zone_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        zone_occupancy.insert(*zone_id, (occupancy, capacity));
    }

    if let Some(tenant_id) = req.subject.user.tenant_id {
        let _: i64 = tx.query_row(
            "SELECT current_usage FROM tenants WHERE id = ?1",
            params![tenant_id],
            |r| r.get(0),
        )?;
    }

    if let Some(session) = req.active_session {
        let _: i64 = tx.query_row(
            "SELECT id FROM parking_sessions WHERE id = ?1",
            params![session.id],
            |r| r.get(0),
        )?;
    }

    if let Some(target_zone_id) = req.gate.zone_to_id {
        let (occupancy, capacity) = zone_occupancy[&target_zone_id];
        if !req.subject.role.may_ignore_capacity && occupancy >= capacity {
            tx.rollback()?;
            return Ok(TransitionOutcome::CapacityExceeded);
        }
    }

    match direction {
        GateDirection::Entry => {
            let zone_id = req.gate.zone_to_id.unwrap();
            tx.execute(
                "UPDATE zones SET occupancy = occupancy + 1 WHERE id = ?1",
                params![zone_id],
            )?;
            if let Some(tenant_id) = req.subject.user.tenant_id {
                tx.execute(
                    "UPDATE tenants SET current_usage = current_usage + 1 WHERE id = ?1",
                    params![tenant_id],
                )?;
            }
            if req.active_session.is_none() {
                tx.execute(
                    "INSERT INTO parking_sessions
                        (user_id, credential_id, entry_gate_id, entry_time, current_zone_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        req.subject.user.id,
                        req.credential_id,
                        req.gate.id,
                        now.to_rfc3339(),
                        zone_id,
                    ],
                )?;
            }
        }
        GateDirection::Transit => {
            let from = req.gate.zone_from_id.unwrap();
            let to = req.gate.zone_to_id.unwrap();
            tx.execute(
                "UPDATE zones SET occupancy = MAX(occupancy - 1, 0) WHERE id = ?1",
                params![from],
            )?;
            tx.execute(
                "UPDATE zones SET occupancy = occupancy + 1 WHERE id = ?1",
                params![to],
            )?;
            if let Some(session) = req.active_session {
                tx.execute(
                    "UPDATE parking_sessions SET current_zone_id = ?1 WHERE id = ?2",
                    params![to, session.id],
                )?;
            }
        }
        GateDirection::Exit => {
            let zone_id = req.gate.zone_from_id.unwrap();
            tx.execute(
                "UPDATE zones SET occupancy = MAX(occupancy - 1, 0) WHERE id = ?1",
                params![zone_id],
            )?;
            if let Some(tenant_id) = req.subject.user.tenant_id {
                tx.execute(
                    "UPDATE tenants SET current_usage = MAX(current_usage - 1, 0) WHERE id = ?1",
                    params![tenant_id],
                )?;
            }
            if let Some(session) = req.active_session {
                tx.execute(
                    "UPDATE parking_sessions SET exit_gate_id = ?1, exit_time = ?2, cost_cents = 0
                     WHERE id = ?3",
                    params![req.gate.id, now.to_rfc3339(), session.id],
                )?;
            }
        }
    }

    tx.execute(
        "UPDATE credentials SET last_used_at = ?1 WHERE id = ?2",
        params![now.to_rfc3339(), req.credential_id],
    )?;

    tx.commit()?;
    Ok(TransitionOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, User};

    fn conn_with_zones() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO roles (id, name) VALUES (1, 'Guest');
             INSERT INTO zones (id, name, capacity, occupancy) VALUES (1, 'Lot A', 2, 0);
             INSERT INTO zones (id, name, capacity, occupancy) VALUES (2, 'Lot B', 5, 0);
             INSERT INTO users (id, first_name, last_name, role_id) VALUES (1, 'A', 'B', 1);
             INSERT INTO gates (id, name, zone_from_id, zone_to_id) VALUES (1, 'Entry', NULL, 1);
             INSERT INTO gates (id, name, zone_from_id, zone_to_id) VALUES (2, 'Exit', 1, NULL);
             INSERT INTO gates (id, name, zone_from_id, zone_to_id) VALUES (3, 'Transit', 1, 2);
             INSERT INTO credentials (id, user_id, kind, value) VALUES (1, 1, 'RFID', 'E1');",
        )
        .unwrap();
        conn
    }

    fn subject(role: Role) -> Subject {
        Subject {
            user: User {
                id: 1,
                first_name: "A".into(),
                last_name: "B".into(),
                role_id: role.id,
                tenant_id: None,
                active: true,
            },
            role,
            tenant: None,
        }
    }

    fn guest_role() -> Role {
        Role {
            id: 1,
            name: "Guest".into(),
            may_ignore_capacity: false,
            may_ignore_antipassback: false,
            may_ignore_schedule: false,
            is_billable: false,
        }
    }

    #[test]
    fn entry_increments_zone_and_creates_session() {
        let mut conn = conn_with_zones();
        let gate = Gate {
            id: 1,
            name: "Entry".into(),
            zone_from_id: None,
            zone_to_id: Some(1),
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: None,
        };
        let outcome = execute(&mut conn, &req, Utc::now()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let occupancy: i64 = conn
            .query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(occupancy, 1);

        let sessions: i64 = conn
            .query_row(
                "SELECT count(*) FROM parking_sessions WHERE user_id = 1 AND exit_time IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(sessions, 1);
    }

    #[test]
    fn entry_into_full_zone_reports_capacity_exceeded_and_rolls_back() {
        let mut conn = conn_with_zones();
        conn.execute("UPDATE zones SET occupancy = 2 WHERE id = 1", [])
            .unwrap();
        let gate = Gate {
            id: 1,
            name: "Entry".into(),
            zone_from_id: None,
            zone_to_id: Some(1),
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: None,
        };
        let outcome = execute(&mut conn, &req, Utc::now()).unwrap();
        assert_eq!(outcome, TransitionOutcome::CapacityExceeded);

        let occupancy: i64 = conn
            .query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(occupancy, 2);
    }

    #[test]
    fn role_ignoring_capacity_still_enters_full_zone() {
        let mut conn = conn_with_zones();
        conn.execute("UPDATE zones SET occupancy = 2 WHERE id = 1", [])
            .unwrap();
        let gate = Gate {
            id: 1,
            name: "Entry".into(),
            zone_from_id: None,
            zone_to_id: Some(1),
        };
        let mut role = guest_role();
        role.may_ignore_capacity = true;
        let subj = subject(role);
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: None,
        };
        let outcome = execute(&mut conn, &req, Utc::now()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);
        let occupancy: i64 = conn
            .query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(occupancy, 3);
    }

    #[test]
    fn exit_decrements_zone_and_closes_session() {
        let mut conn = conn_with_zones();
        conn.execute("UPDATE zones SET occupancy = 1 WHERE id = 1", [])
            .unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO parking_sessions (id, user_id, credential_id, entry_gate_id, entry_time, current_zone_id)
             VALUES (1, 1, 1, 1, ?1, 1)",
            params![now.to_rfc3339()],
        )
        .unwrap();
        let session = ParkingSession {
            id: 1,
            user_id: 1,
            credential_id: 1,
            entry_gate_id: 1,
            entry_time: now,
            current_zone_id: 1,
            exit_gate_id: None,
            exit_time: None,
            cost_cents: 0,
        };
        let gate = Gate {
            id: 2,
            name: "Exit".into(),
            zone_from_id: Some(1),
            zone_to_id: None,
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: Some(&session),
        };
        let outcome = execute(&mut conn, &req, Utc::now()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let occupancy: i64 = conn
            .query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(occupancy, 0);

        let active: i64 = conn
            .query_row(
                "SELECT count(*) FROM parking_sessions WHERE id = 1 AND exit_time IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(active, 0);
    }

    #[test]
    fn occupancy_never_goes_negative_on_exit() {
        let mut conn = conn_with_zones();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO parking_sessions (id, user_id, credential_id, entry_gate_id, entry_time, current_zone_id)
             VALUES (1, 1, 1, 1, ?1, 1)",
            params![now.to_rfc3339()],
        )
        .unwrap();
        let session = ParkingSession {
            id: 1,
            user_id: 1,
            credential_id: 1,
            entry_gate_id: 1,
            entry_time: now,
            current_zone_id: 1,
            exit_gate_id: None,
            exit_time: None,
            cost_cents: 0,
        };
        let gate = Gate {
            id: 2,
            name: "Exit".into(),
            zone_from_id: Some(1),
            zone_to_id: None,
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: Some(&session),
        };
        execute(&mut conn, &req, Utc::now()).unwrap();
        let occupancy: i64 = conn
            .query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(occupancy, 0);
    }

    #[test]
    fn transit_moves_occupancy_between_both_zones() {
        let mut conn = conn_with_zones();
        conn.execute("UPDATE zones SET occupancy = 1 WHERE id = 1", [])
            .unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO parking_sessions (id, user_id, credential_id, entry_gate_id, entry_time, current_zone_id)
             VALUES (1, 1, 1, 1, ?1, 1)",
            params![now.to_rfc3339()],
        )
        .unwrap();
        let session = ParkingSession {
            id: 1,
            user_id: 1,
            credential_id: 1,
            entry_gate_id: 1,
            entry_time: now,
            current_zone_id: 1,
            exit_gate_id: None,
            exit_time: None,
            cost_cents: 0,
        };
        let gate = Gate {
            id: 3,
            name: "Transit".into(),
            zone_from_id: Some(1),
            zone_to_id: Some(2),
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: Some(&session),
        };
        let outcome = execute(&mut conn, &req, Utc::now()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);

        let (occ_a, occ_b): (i64, i64) = (
            conn.query_row("SELECT occupancy FROM zones WHERE id = 1", [], |r| r.get(0))
                .unwrap(),
            conn.query_row("SELECT occupancy FROM zones WHERE id = 2", [], |r| r.get(0))
                .unwrap(),
        );
        assert_eq!(occ_a, 0);
        assert_eq!(occ_b, 1);

        let current_zone: i64 = conn
            .query_row(
                "SELECT current_zone_id FROM parking_sessions WHERE id = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(current_zone, 2);
    }

    #[test]
    fn gate_with_no_zones_is_rejected() {
        let mut conn = conn_with_zones();
        let gate = Gate {
            id: 99,
            name: "Orphan".into(),
            zone_from_id: None,
            zone_to_id: None,
        };
        let subj = subject(guest_role());
        let req = TransitionRequest {
            gate: &gate,
            subject: &subj,
            credential_id: 1,
            active_session: None,
        };
        let result = execute(&mut conn, &req, Utc::now());
        assert!(matches!(result, Err(EngineError::InvalidGate(99))));
    }
}
