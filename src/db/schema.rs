//! Schema migrations, same `meta`-table + numbered `migrate_vN` idiom as
//! this codebase's other embedded-SQLite consumer.

use rusqlite::Connection;

const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    let current = get_schema_version(conn)?;
    if current < 1 {
        migrate_v1(conn)?;
    }
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = 'schema_version'",
        [],
        |row| row.get::<_, String>(0),
    )
    .map(|v| v.parse().unwrap_or(0))
    .or(Ok(0))
}

fn set_schema_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [version.to_string()],
    )?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            may_ignore_capacity INTEGER NOT NULL DEFAULT 0,
            may_ignore_antipassback INTEGER NOT NULL DEFAULT 0,
            may_ignore_schedule INTEGER NOT NULL DEFAULT 0,
            is_billable INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quota_limit INTEGER NOT NULL DEFAULT 0,
            current_usage INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role_id INTEGER NOT NULL REFERENCES roles(id),
            tenant_id INTEGER REFERENCES tenants(id) ON DELETE SET NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role_id);
        CREATE INDEX IF NOT EXISTS idx_users_tenant ON users(tenant_id);

        CREATE TABLE IF NOT EXISTS credentials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            value TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            last_used_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_credentials_value ON credentials(value);
        CREATE INDEX IF NOT EXISTS idx_credentials_user ON credentials(user_id);

        CREATE TABLE IF NOT EXISTS zones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            capacity INTEGER NOT NULL DEFAULT 0,
            occupancy INTEGER NOT NULL DEFAULT 0,
            parent_zone_id INTEGER REFERENCES zones(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_zones_parent ON zones(parent_zone_id);

        CREATE TABLE IF NOT EXISTS gates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            zone_from_id INTEGER REFERENCES zones(id),
            zone_to_id INTEGER REFERENCES zones(id)
        );

        CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            ip_address TEXT NOT NULL UNIQUE,
            port INTEGER NOT NULL DEFAULT 5005,
            kind TEXT NOT NULL,
            config TEXT,
            gate_id INTEGER NOT NULL REFERENCES gates(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_devices_gate ON devices(gate_id);

        CREATE TABLE IF NOT EXISTS validation_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scope TEXT NOT NULL,
            kind TEXT NOT NULL,
            target_zone_id INTEGER REFERENCES zones(id) ON DELETE CASCADE,
            target_gate_id INTEGER REFERENCES gates(id) ON DELETE CASCADE,
            target_role_id INTEGER REFERENCES roles(id) ON DELETE CASCADE,
            enabled INTEGER NOT NULL DEFAULT 1,
            params TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_rules_zone ON validation_rules(target_zone_id);
        CREATE INDEX IF NOT EXISTS idx_rules_gate ON validation_rules(target_gate_id);
        CREATE INDEX IF NOT EXISTS idx_rules_role ON validation_rules(target_role_id);

        CREATE TABLE IF NOT EXISTS parking_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            credential_id INTEGER NOT NULL REFERENCES credentials(id),
            entry_gate_id INTEGER NOT NULL REFERENCES gates(id),
            entry_time TEXT NOT NULL,
            current_zone_id INTEGER NOT NULL REFERENCES zones(id),
            exit_gate_id INTEGER REFERENCES gates(id),
            exit_time TEXT,
            cost_cents INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user_active
            ON parking_sessions(user_id) WHERE exit_time IS NULL;

        CREATE TABLE IF NOT EXISTS scan_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            gate_id INTEGER REFERENCES gates(id) ON DELETE SET NULL,
            gate_name_snapshot TEXT NOT NULL,
            scan_kind TEXT NOT NULL,
            raw_payload TEXT NOT NULL,
            granted INTEGER NOT NULL,
            denial_reason TEXT NOT NULL,
            resolved_user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            resolved_tenant_id INTEGER REFERENCES tenants(id) ON DELETE SET NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scan_logs_created_at ON scan_logs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_scan_logs_gate ON scan_logs(gate_id);
        CREATE INDEX IF NOT EXISTS idx_scan_logs_raw_payload ON scan_logs(raw_payload);
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |r| {
                r.get::<_, String>(0).map(|s| s.parse().unwrap())
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn creates_all_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        for table in [
            "roles",
            "tenants",
            "users",
            "credentials",
            "zones",
            "gates",
            "devices",
            "validation_rules",
            "parking_sessions",
            "scan_logs",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type='table' AND name = ?1",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "expected table {table} to exist");
        }
    }
}
