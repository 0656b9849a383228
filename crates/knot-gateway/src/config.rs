//! TOML-based configuration for the gateway.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GatewayError;

/// Top-level gateway configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("failed to read config file: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("failed to parse config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        toml::from_str(s).map_err(|e| GatewayError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[gateway]` section.
#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    /// Unix socket the node transport listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/run/knot/gateway.sock")
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GatewayConfig::parse("").unwrap();
        assert_eq!(
            config.gateway.socket_path,
            PathBuf::from("/run/knot/gateway.sock")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config_parses() {
        let config = GatewayConfig::parse(
            r#"
            [gateway]
            socket_path = "/tmp/knot-test.sock"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.socket_path, PathBuf::from("/tmp/knot-test.sock"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = GatewayConfig::parse("[gateway").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
