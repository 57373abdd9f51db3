mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level accessd configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    /// State directory for persistent data (the embedded database file).
    #[serde(skip)]
    pub state_dir: PathBuf,
}

impl Config {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(find_config_file)
            .unwrap_or_else(|| PathBuf::from("accessd.json"));

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            load_config_file(&config_path)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.state_dir = resolve_state_dir();

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the on-disk path of the embedded database from `database.url`.
    ///
    /// Accepts a bare `:memory:`, a `sqlite://<path>` URL, or a plain path —
    /// relative plain paths are resolved against `state_dir`.
    pub fn resolved_db_path(&self) -> String {
        let url = self.database.url.trim();

        if url == ":memory:" {
            return url.to_string();
        }

        let raw = url.strip_prefix("sqlite://").unwrap_or(url);
        let path = Path::new(raw);

        if path.is_absolute() {
            raw.to_string()
        } else {
            self.state_dir.join(raw).to_string_lossy().into_owned()
        }
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ACCESSD_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ACCESSD_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(port) = std::env::var("ACCESSD_HARDWARE_PORT") {
            if let Ok(port) = port.parse() {
                self.hardware.port = port;
            }
        }
        if let Ok(ms) = std::env::var("ACCESSD_HARDWARE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                self.hardware.timeout_ms = ms;
            }
        }

        if let Ok(host) = std::env::var("ACCESSD_ADMIN_HOST") {
            self.admin.host = host;
        }
        if let Ok(port) = std::env::var("ACCESSD_ADMIN_PORT") {
            if let Ok(port) = port.parse() {
                self.admin.port = port;
            }
        }
        if let Ok(token) = std::env::var("ACCESSD_ADMIN_TOKEN") {
            self.admin.token = Some(token);
        }

        if let Ok(url) = std::env::var("ACCESSD_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secs) = std::env::var("ACCESSD_DEBOUNCE_WINDOW_SECS") {
            if let Ok(secs) = secs.parse() {
                self.debounce.window_secs = secs;
            }
        }

        if let Ok(level) = std::env::var("ACCESSD_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            hardware: HardwareConfig::default(),
            admin: AdminConfig::default(),
            database: DatabaseConfig::default(),
            debounce: DebounceConfig::default(),
            logging: LoggingConfig::default(),
            state_dir: resolve_state_dir(),
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("accessd.json"),
        PathBuf::from("accessd.yaml"),
        PathBuf::from("accessd.yml"),
        PathBuf::from("accessd.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".accessd").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Resolve the state directory for persistent data.
fn resolve_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ACCESSD_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|h| h.join(".accessd"))
        .unwrap_or_else(|| PathBuf::from(".accessd"))
}

/// Load configuration from a file path.
fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => json5::from_str(&content).or_else(|_| {
            serde_json::from_str(&content).map_err(|e| json5::Error::Message {
                msg: e.to_string(),
                location: None,
            })
        })?,
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.hardware.port, 5005);
        assert_eq!(config.admin.port, 8088);
        assert_eq!(config.debounce.window_secs, 20);
    }

    #[test]
    fn resolved_db_path_passes_memory_through() {
        let mut config = Config::default();
        config.database.url = ":memory:".to_string();
        assert_eq!(config.resolved_db_path(), ":memory:");
    }

    #[test]
    fn resolved_db_path_strips_sqlite_scheme() {
        let mut config = Config::default();
        config.state_dir = PathBuf::from("/var/lib/accessd");
        config.database.url = "sqlite://access.db".to_string();
        assert_eq!(
            config.resolved_db_path(),
            "/var/lib/accessd/access.db"
        );
    }

    #[test]
    fn resolved_db_path_resolves_relative_path_under_state_dir() {
        let mut config = Config::default();
        config.state_dir = PathBuf::from("/var/lib/accessd");
        config.database.url = "access.db".to_string();
        assert_eq!(
            config.resolved_db_path(),
            "/var/lib/accessd/access.db"
        );
    }

    #[test]
    fn resolved_db_path_keeps_absolute_path_as_is() {
        let mut config = Config::default();
        config.state_dir = PathBuf::from("/var/lib/accessd");
        config.database.url = "/data/access.db".to_string();
        assert_eq!(config.resolved_db_path(), "/data/access.db");
    }

    #[test]
    fn env_overrides_apply_on_top_of_file_defaults() {
        std::env::set_var("ACCESSD_SERVER_PORT", "9100");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 9100);
        std::env::remove_var("ACCESSD_SERVER_PORT");
    }
}
