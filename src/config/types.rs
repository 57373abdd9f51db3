use serde::{Deserialize, Serialize};

use super::defaults::*;

// ============================================================================
// Server (TCP ingress) Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_INGRESS_PORT,
        }
    }
}

// ============================================================================
// Hardware (outbound open-command) Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareConfig {
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HARDWARE_PORT,
            timeout_ms: DEFAULT_HARDWARE_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// Admin HTTP Surface Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ADMIN_HOST.to_string(),
            port: DEFAULT_ADMIN_PORT,
            token: None,
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

// ============================================================================
// Debounce Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceConfig {
    pub window_secs: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_DEBOUNCE_WINDOW_SECS,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default_matches_spec() {
        let c = ServerConfig::default();
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 7000);
    }

    #[test]
    fn hardware_config_default_matches_spec() {
        let c = HardwareConfig::default();
        assert_eq!(c.port, 5005);
        assert_eq!(c.timeout_ms, 2000);
    }

    #[test]
    fn admin_config_default_has_no_token() {
        let c = AdminConfig::default();
        assert_eq!(c.port, 8088);
        assert!(c.token.is_none());
    }

    #[test]
    fn debounce_config_default_is_twenty_seconds() {
        assert_eq!(DebounceConfig::default().window_secs, 20);
    }
}
