//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files including bind address, database
//! location, lock timeout, and log level.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8081)
    pub bind_port: u16,

    /// SQLite database file, or `:memory:`
    pub database_path: String,

    /// How long a write waits on another connection's lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Fallback log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;

        if config.database_path.is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }

        Ok(config)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8081,
            database_path: ":memory:".to_string(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_log_level(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Lock timeout handed to the store
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 8081);
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8081");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "/var/lib/amity/amity.db"
            busy_timeout_ms = 250
            log_level = "amity_engine=debug"
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.database_path, "/var/lib/amity/amity.db");
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_level, "amity_engine=debug");
    }

    #[test]
    fn test_optional_fields_default() {
        let toml = r#"
            bind_address = "127.0.0.1"
            bind_port = 8081
            database_path = "amity.db"
        "#;

        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_rejects_empty_database_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_address = \"127.0.0.1\"\nbind_port = 8081\ndatabase_path = \"\""
        )
        .unwrap();

        let result = ServerConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::MissingField(field)) if field == "database_path"));
    }

    #[test]
    fn test_from_file_missing_file() {
        let result = ServerConfig::from_file("/nonexistent/amity.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
