//! Rule Repository — the enabled-rule lookup for a (gate, target-zone, role)
//! triple. A thin SQL filter rather than a full fetch-then-filter, since the
//! persistence layer already owns connection handling.

use crate::domain::ValidationRule;
use crate::errors::PersistenceError;
use crate::persistence::map_rule;
use rusqlite::{params, Connection};

pub fn applicable_rules(
    conn: &Connection,
    gate_id: i64,
    target_zone_id: Option<i64>,
    role_id: i64,
) -> Result<Vec<ValidationRule>, PersistenceError> {
    let mut stmt = conn.prepare(
        "SELECT id, scope, kind, target_zone_id, target_gate_id, target_role_id, enabled, params
         FROM validation_rules
         WHERE enabled = 1 AND (
             scope = 'GLOBAL'
             OR (scope = 'ZONE' AND target_zone_id = ?1)
             OR (scope = 'GATE' AND target_gate_id = ?2)
             OR (scope = 'ROLE' AND target_role_id = ?3)
         )",
    )?;
    let rows = stmt
        .query_map(params![target_zone_id, gate_id, role_id], map_rule)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO roles (id, name) VALUES (1, 'Tenant');
             INSERT INTO zones (id, name, capacity, occupancy) VALUES (1, 'Garage', 10, 0);
             INSERT INTO gates (id, name, zone_from_id, zone_to_id) VALUES (1, 'Main Entry', NULL, 1);
             INSERT INTO validation_rules (scope, kind, enabled) VALUES ('GLOBAL', 'CAPACITY', 1);
             INSERT INTO validation_rules (scope, kind, target_zone_id, enabled) VALUES ('ZONE', 'ANTIPASSBACK', 1, 1);
             INSERT INTO validation_rules (scope, kind, target_zone_id, enabled) VALUES ('ZONE', 'SCHEDULE', 2, 1);
             INSERT INTO validation_rules (scope, kind, target_gate_id, enabled) VALUES ('GATE', 'PAYMENT', 1, 1);
             INSERT INTO validation_rules (scope, kind, target_role_id, enabled) VALUES ('ROLE', 'BLACKLIST', 1, 1);
             INSERT INTO validation_rules (scope, kind, enabled) VALUES ('GLOBAL', 'SCHEDULE', 0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn returns_global_zone_gate_and_role_scoped_rules() {
        let conn = seeded_conn();
        let rules = applicable_rules(&conn, 1, Some(1), 1).unwrap();
        let kinds: Vec<_> = rules.iter().map(|r| r.kind.as_str()).collect();
        assert!(kinds.contains(&"CAPACITY"));
        assert!(kinds.contains(&"ANTIPASSBACK"));
        assert!(kinds.contains(&"PAYMENT"));
        assert!(kinds.contains(&"BLACKLIST"));
        assert!(!kinds.contains(&"SCHEDULE"), "zone-2 and disabled rules must be excluded");
    }

    #[test]
    fn zone_scoped_rule_excluded_when_target_zone_is_none() {
        let conn = seeded_conn();
        let rules = applicable_rules(&conn, 1, None, 1).unwrap();
        assert!(rules.iter().all(|r| r.kind.as_str() != "ANTIPASSBACK"));
    }

    #[test]
    fn disabled_rules_are_never_returned() {
        let conn = seeded_conn();
        let rules = applicable_rules(&conn, 1, Some(1), 1).unwrap();
        assert!(rules.iter().all(|r| r.enabled));
    }
}
