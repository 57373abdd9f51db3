use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four scannable credential kinds. Closed, tagged — unknown strings
/// are rejected at the ingress boundary rather than represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CredentialKind {
    Rfid,
    Lpr,
    Qr,
    Pin,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Rfid => "RFID",
            CredentialKind::Lpr => "LPR",
            CredentialKind::Qr => "QR",
            CredentialKind::Pin => "PIN",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RFID" => Ok(CredentialKind::Rfid),
            "LPR" => Ok(CredentialKind::Lpr),
            "QR" => Ok(CredentialKind::Qr),
            "PIN" => Ok(CredentialKind::Pin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub user_id: i64,
    pub kind: CredentialKind,
    pub value: String,
    pub active: bool,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}
