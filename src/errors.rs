//! Error taxonomy.
//!
//! `DenialReason` is domain data — it must serialize to exactly the strings
//! SPEC_FULL §7 names, since it is recorded verbatim in ScanLog and the live
//! feed. `PersistenceError`/`EngineError` are ordinary library error enums
//! for callers to match on; the binary and HTTP handlers collapse them into
//! `anyhow::Error` / status codes the way the rest of this codebase does.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    UnknownCredential,
    UserInactive,
    Blacklisted,
    UnknownGate,
    ZoneFull,
    TenantQuotaExceeded,
    AlreadyInside,
    NoEntryRecord,
    ApbViolationWrongZone,
    DuplicateScanIgnored,
    SystemError,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::UnknownCredential => "UNKNOWN_CREDENTIAL",
            DenialReason::UserInactive => "USER_INACTIVE",
            DenialReason::Blacklisted => "BLACKLISTED",
            DenialReason::UnknownGate => "UNKNOWN_GATE",
            DenialReason::ZoneFull => "ZONE_FULL",
            DenialReason::TenantQuotaExceeded => "TENANT_QUOTA_EXCEEDED",
            DenialReason::AlreadyInside => "ALREADY_INSIDE",
            DenialReason::NoEntryRecord => "NO_ENTRY_RECORD",
            DenialReason::ApbViolationWrongZone => "APB_VIOLATION_WRONG_ZONE",
            DenialReason::DuplicateScanIgnored => "DUPLICATE_SCAN_IGNORED",
            DenialReason::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granted-access reason, kept distinct from `DenialReason` since it is
/// never a denial (also covers the manual-override audit marker).
pub const ACCESS_GRANTED: &str = "ACCESS_GRANTED";
pub const MANUAL_OPEN_DASHBOARD: &str = "MANUAL_OPEN_DASHBOARD";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("no rows matched: {0}")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no controller found for gate")]
    NoControllerForGate,
    #[error("hardware command failed: {0}")]
    HardwareCommand(String),
    #[error("gate {0} has no zone on either side")]
    InvalidGate(i64),
}
