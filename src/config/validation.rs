use super::Config;
use anyhow::Result;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ConfigValidationError {
            path: "server.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if config.hardware.port == 0 {
        errors.push(ConfigValidationError {
            path: "hardware.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if config.admin.port == 0 {
        errors.push(ConfigValidationError {
            path: "admin.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if config.server.port == config.admin.port {
        errors.push(ConfigValidationError {
            path: "admin.port".to_string(),
            message: "Admin port must differ from the ingress port".to_string(),
        });
    }

    if config.debounce.window_secs == 0 {
        errors.push(ConfigValidationError {
            path: "debounce.windowSecs".to_string(),
            message: "Debounce window must be greater than 0".to_string(),
        });
    }

    if config.database.url.trim().is_empty() {
        errors.push(ConfigValidationError {
            path: "database.url".to_string(),
            message: "Database URL must not be empty".to_string(),
        });
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_empty());
    }

    #[test]
    fn zero_server_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.path == "server.port"));
    }

    #[test]
    fn clashing_server_and_admin_ports_are_rejected() {
        let mut config = Config::default();
        config.admin.port = config.server.port;
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.path == "admin.port"));
    }

    #[test]
    fn zero_debounce_window_is_rejected() {
        let mut config = Config::default();
        config.debounce.window_secs = 0;
        assert!(validate_config_object(&config).is_err());
    }
}
