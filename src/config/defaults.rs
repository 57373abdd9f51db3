/// Default configuration constants used across the system.

/// Default TCP ingress bind host.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default TCP ingress port.
pub const DEFAULT_INGRESS_PORT: u16 = 7000;

/// Default outbound hardware command port.
pub const DEFAULT_HARDWARE_PORT: u16 = 5005;

/// Default hardware command connect+send timeout.
pub const DEFAULT_HARDWARE_TIMEOUT_MS: u64 = 2000;

/// Default admin HTTP bind host.
pub const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";

/// Default admin HTTP port.
pub const DEFAULT_ADMIN_PORT: u16 = 8088;

/// Default database URL/path, resolved relative to the state directory.
pub const DEFAULT_DATABASE_URL: &str = "access.db";

/// Default debounce window, in seconds.
pub const DEFAULT_DEBOUNCE_WINDOW_SECS: u64 = 20;

/// Default tracing level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";
