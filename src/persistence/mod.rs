//! Persistence Adapter — typed read/write access over the relational store.
//!
//! Grounded on `parking_service.py`'s load sequence (gate -> zones -> credential
//! -> rules -> active session) and this codebase's existing `rusqlite` usage
//! in `memory/manager.rs` / `memory/search.rs` (prepared statements, row
//! mapping by hand, no ORM).

use crate::db::DbPool;
use crate::domain::*;
use crate::errors::PersistenceError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

pub struct PersistenceAdapter {
    pool: DbPool,
}

type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceAdapter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    pub fn find_device_by_ip(&self, ip: &str) -> Result<Option<Device>> {
        let conn = self.conn()?;
        find_device_by_ip(&conn, ip)
    }

    pub fn find_gate(&self, gate_id: i64) -> Result<Option<Gate>> {
        let conn = self.conn()?;
        find_gate(&conn, gate_id)
    }

    pub fn find_device_for_gate(&self, gate_id: i64) -> Result<Option<Device>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, ip_address, port, kind, config, gate_id FROM devices WHERE gate_id = ?1 LIMIT 1",
            params![gate_id],
            map_device,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn find_zone(&self, zone_id: i64) -> Result<Option<Zone>> {
        let conn = self.conn()?;
        find_zone(&conn, zone_id)
    }

    pub fn find_active_credential(
        &self,
        kind: CredentialKind,
        value: &str,
    ) -> Result<Option<(Credential, Subject)>> {
        let conn = self.conn()?;
        let cred = conn
            .query_row(
                "SELECT id, user_id, kind, value, active, last_used_at
                 FROM credentials WHERE kind = ?1 AND value = ?2 AND active = 1",
                params![kind.as_str(), value],
                map_credential,
            )
            .optional()?;
        let Some(cred) = cred else {
            return Ok(None);
        };
        let user = conn
            .query_row(
                "SELECT id, first_name, last_name, role_id, tenant_id, active
                 FROM users WHERE id = ?1",
                params![cred.user_id],
                map_user,
            )
            .optional()?;
        let Some(user) = user else {
            return Ok(None);
        };
        let role = conn.query_row(
            "SELECT id, name, may_ignore_capacity, may_ignore_antipassback, may_ignore_schedule, is_billable
             FROM roles WHERE id = ?1",
            params![user.role_id],
            map_role,
        )?;
        let tenant = match user.tenant_id {
            Some(tid) => conn
                .query_row(
                    "SELECT id, name, quota_limit, current_usage, active FROM tenants WHERE id = ?1",
                    params![tid],
                    map_tenant,
                )
                .optional()?,
            None => None,
        };
        Ok(Some((cred, Subject { user, role, tenant })))
    }

    pub fn find_active_session(&self, user_id: i64) -> Result<Option<ParkingSession>> {
        let conn = self.conn()?;
        find_active_session(&conn, user_id)
    }

    pub fn record_scan_log(&self, log: &NewScanLog) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scan_logs
                (created_at, gate_id, gate_name_snapshot, scan_kind, raw_payload,
                 granted, denial_reason, resolved_user_id, resolved_tenant_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                log.created_at.to_rfc3339(),
                log.gate_id,
                log.gate_name_snapshot,
                log.scan_kind.as_str(),
                log.raw_payload,
                log.granted as i64,
                log.denial_reason,
                log.resolved_user_id,
                log.resolved_tenant_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_scan_logs(&self, limit: i64) -> Result<Vec<ScanLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, gate_id, gate_name_snapshot, scan_kind, raw_payload,
                    granted, denial_reason, resolved_user_id, resolved_tenant_id
             FROM scan_logs ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_scan_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_scan_log_by_id(&self, id: i64) -> Result<Option<ScanLog>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, created_at, gate_id, gate_name_snapshot, scan_kind, raw_payload,
                    granted, denial_reason, resolved_user_id, resolved_tenant_id
             FROM scan_logs WHERE id = ?1",
            params![id],
            map_scan_log,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn touch_credential(&self, credential_id: i64, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE credentials SET last_used_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), credential_id],
        )?;
        Ok(())
    }

    /// Raw connection access for the State Transition Executor, which needs
    /// `Connection::transaction` (a `&mut Connection` borrow) directly.
    pub fn raw_conn(
        &self,
    ) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.conn()
    }

    pub fn all_zones(&self) -> Result<Vec<Zone>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, capacity, occupancy, parent_zone_id FROM zones")?;
        let rows = stmt
            .query_map([], map_zone)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all_gates(&self) -> Result<Vec<Gate>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, zone_from_id, zone_to_id FROM gates")?;
        let rows = stmt
            .query_map([], map_gate)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all_devices(&self) -> Result<Vec<Device>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, ip_address, port, kind, config, gate_id FROM devices")?;
        let rows = stmt
            .query_map([], map_device)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all_roles(&self) -> Result<Vec<Role>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, may_ignore_capacity, may_ignore_antipassback, may_ignore_schedule, is_billable
             FROM roles",
        )?;
        let rows = stmt
            .query_map([], map_role)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_role(&self, new: &NewRole) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO roles (name, may_ignore_capacity, may_ignore_antipassback, may_ignore_schedule, is_billable)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.name,
                new.may_ignore_capacity as i64,
                new.may_ignore_antipassback as i64,
                new.may_ignore_schedule as i64,
                new.is_billable as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn all_tenants(&self) -> Result<Vec<Tenant>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, quota_limit, current_usage, active FROM tenants")?;
        let rows = stmt
            .query_map([], map_tenant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_tenant(&self, new: &NewTenant) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tenants (name, quota_limit, current_usage, active) VALUES (?1, ?2, 0, 1)",
            params![new.name, new.quota_limit],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, first_name, last_name, role_id, tenant_id, active FROM users")?;
        let rows = stmt
            .query_map([], map_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_user(&self, new: &NewUser) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (first_name, last_name, role_id, tenant_id, active)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![new.first_name, new.last_name, new.role_id, new.tenant_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_credential(&self, new: &NewCredential) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO credentials (user_id, kind, value, active) VALUES (?1, ?2, ?3, 1)",
            params![new.user_id, new.kind.as_str(), new.value],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_zone(&self, new: &NewZone) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO zones (name, capacity, occupancy, parent_zone_id) VALUES (?1, ?2, 0, ?3)",
            params![new.name, new.capacity, new.parent_zone_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_gate(&self, new: &NewGate) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO gates (name, zone_from_id, zone_to_id) VALUES (?1, ?2, ?3)",
            params![new.name, new.zone_from_id, new.zone_to_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_device(&self, new: &NewDevice) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO devices (name, ip_address, port, kind, config, gate_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![new.name, new.ip_address, new.port as i64, new.kind, new.config, new.gate_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_rule(&self, new: &NewRule) -> Result<i64> {
        let conn = self.conn()?;
        let (scope, zone, gate, role) = match new.target {
            RuleTarget::Global => ("GLOBAL", None, None, None),
            RuleTarget::Zone(id) => ("ZONE", Some(id), None, None),
            RuleTarget::Gate(id) => ("GATE", None, Some(id), None),
            RuleTarget::Role(id) => ("ROLE", None, None, Some(id)),
        };
        conn.execute(
            "INSERT INTO validation_rules
                (scope, kind, target_zone_id, target_gate_id, target_role_id, enabled, params)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![scope, new.kind.as_str(), zone, gate, role, new.params],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn all_rules(&self) -> Result<Vec<ValidationRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, scope, kind, target_zone_id, target_gate_id, target_role_id, enabled, params
             FROM validation_rules",
        )?;
        let rows = stmt
            .query_map([], map_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_rule_enabled(&self, rule_id: i64, enabled: bool) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE validation_rules SET enabled = ?1 WHERE id = ?2",
            params![enabled as i64, rule_id],
        )?;
        Ok(changed > 0)
    }

    pub fn toggle_rule(&self, rule_id: i64) -> Result<Option<bool>> {
        let conn = self.conn()?;
        let current: Option<i64> = conn
            .query_row(
                "SELECT enabled FROM validation_rules WHERE id = ?1",
                params![rule_id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(None);
        };
        let new_value = current == 0;
        conn.execute(
            "UPDATE validation_rules SET enabled = ?1 WHERE id = ?2",
            params![new_value as i64, rule_id],
        )?;
        Ok(Some(new_value))
    }
}

pub struct NewRole {
    pub name: String,
    pub may_ignore_capacity: bool,
    pub may_ignore_antipassback: bool,
    pub may_ignore_schedule: bool,
    pub is_billable: bool,
}

pub struct NewTenant {
    pub name: String,
    pub quota_limit: i64,
}

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub role_id: i64,
    pub tenant_id: Option<i64>,
}

pub struct NewCredential {
    pub user_id: i64,
    pub kind: CredentialKind,
    pub value: String,
}

pub struct NewZone {
    pub name: String,
    pub capacity: i64,
    pub parent_zone_id: Option<i64>,
}

pub struct NewGate {
    pub name: String,
    pub zone_from_id: Option<i64>,
    pub zone_to_id: Option<i64>,
}

pub struct NewDevice {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    pub kind: String,
    pub config: Option<String>,
    pub gate_id: i64,
}

pub struct NewRule {
    pub target: RuleTarget,
    pub kind: RuleKind,
    pub params: Option<String>,
}

/// Data needed to append a ScanLog row.
pub struct NewScanLog {
    pub created_at: DateTime<Utc>,
    pub gate_id: Option<i64>,
    pub gate_name_snapshot: String,
    pub scan_kind: CredentialKind,
    pub raw_payload: String,
    pub granted: bool,
    pub denial_reason: String,
    pub resolved_user_id: Option<i64>,
    pub resolved_tenant_id: Option<i64>,
}

// ============================================================================
// Row mapping helpers, shared with the executor and the rule repository,
// which both need to read within an open transaction rather than via a
// fresh pooled connection.
// ============================================================================

pub(crate) fn find_device_by_ip(conn: &Connection, ip: &str) -> Result<Option<Device>> {
    conn.query_row(
        "SELECT id, name, ip_address, port, kind, config, gate_id FROM devices WHERE ip_address = ?1",
        params![ip],
        map_device,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn find_gate(conn: &Connection, gate_id: i64) -> Result<Option<Gate>> {
    conn.query_row(
        "SELECT id, name, zone_from_id, zone_to_id FROM gates WHERE id = ?1",
        params![gate_id],
        map_gate,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn find_zone(conn: &Connection, zone_id: i64) -> Result<Option<Zone>> {
    conn.query_row(
        "SELECT id, name, capacity, occupancy, parent_zone_id FROM zones WHERE id = ?1",
        params![zone_id],
        map_zone,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn find_active_session(
    conn: &Connection,
    user_id: i64,
) -> Result<Option<ParkingSession>> {
    conn.query_row(
        "SELECT id, user_id, credential_id, entry_gate_id, entry_time, current_zone_id,
                exit_gate_id, exit_time, cost_cents
         FROM parking_sessions WHERE user_id = ?1 AND exit_time IS NULL",
        params![user_id],
        map_session,
    )
    .optional()
    .map_err(Into::into)
}

fn map_device(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        ip_address: row.get(2)?,
        port: row.get::<_, i64>(3)? as u16,
        kind: row.get(4)?,
        config: row.get(5)?,
        gate_id: row.get(6)?,
    })
}

fn map_gate(row: &Row<'_>) -> rusqlite::Result<Gate> {
    Ok(Gate {
        id: row.get(0)?,
        name: row.get(1)?,
        zone_from_id: row.get(2)?,
        zone_to_id: row.get(3)?,
    })
}

fn map_zone(row: &Row<'_>) -> rusqlite::Result<Zone> {
    Ok(Zone {
        id: row.get(0)?,
        name: row.get(1)?,
        capacity: row.get(2)?,
        occupancy: row.get(3)?,
        parent_zone_id: row.get(4)?,
    })
}

fn map_credential(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let kind_str: String = row.get(2)?;
    let last_used: Option<String> = row.get(5)?;
    Ok(Credential {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: CredentialKind::from_str(&kind_str).unwrap_or(CredentialKind::Rfid),
        value: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
        last_used_at: last_used.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        role_id: row.get(3)?,
        tenant_id: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
    })
}

fn map_role(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        may_ignore_capacity: row.get::<_, i64>(2)? != 0,
        may_ignore_antipassback: row.get::<_, i64>(3)? != 0,
        may_ignore_schedule: row.get::<_, i64>(4)? != 0,
        is_billable: row.get::<_, i64>(5)? != 0,
    })
}

fn map_tenant(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        quota_limit: row.get(2)?,
        current_usage: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
    })
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<ParkingSession> {
    let entry_time: String = row.get(4)?;
    let exit_time: Option<String> = row.get(7)?;
    Ok(ParkingSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        credential_id: row.get(2)?,
        entry_gate_id: row.get(3)?,
        entry_time: parse_dt(&entry_time),
        current_zone_id: row.get(5)?,
        exit_gate_id: row.get(6)?,
        exit_time: exit_time.map(|s| parse_dt(&s)),
        cost_cents: row.get(8)?,
    })
}

fn map_scan_log(row: &Row<'_>) -> rusqlite::Result<ScanLog> {
    let created_at: String = row.get(1)?;
    let kind_str: String = row.get(4)?;
    Ok(ScanLog {
        id: row.get(0)?,
        created_at: parse_dt(&created_at),
        gate_id: row.get(2)?,
        gate_name_snapshot: row.get(3)?,
        scan_kind: CredentialKind::from_str(&kind_str).unwrap_or(CredentialKind::Rfid),
        raw_payload: row.get(5)?,
        granted: row.get::<_, i64>(6)? != 0,
        denial_reason: row.get(7)?,
        resolved_user_id: row.get(8)?,
        resolved_tenant_id: row.get(9)?,
    })
}

pub(crate) fn map_rule(row: &Row<'_>) -> rusqlite::Result<ValidationRule> {
    let scope: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let target_zone: Option<i64> = row.get(3)?;
    let target_gate: Option<i64> = row.get(4)?;
    let target_role: Option<i64> = row.get(5)?;
    let target = match scope.as_str() {
        "ZONE" => RuleTarget::Zone(target_zone.unwrap_or_default()),
        "GATE" => RuleTarget::Gate(target_gate.unwrap_or_default()),
        "ROLE" => RuleTarget::Role(target_role.unwrap_or_default()),
        _ => RuleTarget::Global,
    };
    let kind = match kind.as_str() {
        "ANTIPASSBACK" => RuleKind::Antipassback,
        "SCHEDULE" => RuleKind::Schedule,
        "PAYMENT" => RuleKind::Payment,
        "BLACKLIST" => RuleKind::Blacklist,
        _ => RuleKind::Capacity,
    };
    Ok(ValidationRule {
        id: row.get(0)?,
        target,
        kind,
        enabled: row.get::<_, i64>(6)? != 0,
        params: row.get(7)?,
    })
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
