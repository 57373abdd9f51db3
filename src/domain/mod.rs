//! Domain entities for the access decision engine.
//!
//! Plain structs, hand-mapped to SQLite rows by the persistence layer —
//! there is no ORM between the two.

mod credential;
mod device;
mod gate;
mod role;
mod rule;
mod scan_log;
mod session;
mod tenant;
mod user;
mod zone;

pub use credential::{Credential, CredentialKind};
pub use device::Device;
pub use gate::{Gate, GateDirection};
pub use role::Role;
pub use rule::{RuleKind, RuleScope, RuleTarget, ValidationRule};
pub use scan_log::ScanLog;
pub use session::ParkingSession;
pub use tenant::Tenant;
pub use user::{Subject, User};
pub use zone::Zone;
