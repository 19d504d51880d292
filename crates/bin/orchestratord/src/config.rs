//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `orchestrator.toml` in the working directory (or the file named
//! by `ORCHESTRATOR_CONFIG`). Every field has a sensible default so the file
//! is optional. Environment variables take precedence over file values.

use std::collections::BTreeSet;

use serde::Deserialize;

use orchestrator_adapter_storage_sqlite_sqlx::Config as StorageConfig;
use orchestrator_app::catalog::StaticCatalog;
use orchestrator_app::transaction::RetryPolicy;
use orchestrator_domain::transport::{Protocol, Serialization};

use crate::seed::DeviceSeed;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Unit-of-work settings.
    pub engine: EngineConfig,
    /// Known protocols and serializations.
    pub catalog: CatalogConfig,
    /// Inventory applied at startup.
    pub devices: Vec<DeviceSeed>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Unit-of-work configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often a unit that hit a storage conflict is attempted in total.
    pub max_attempts: u32,
}

/// A protocol entry of the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    pub name: String,
    #[serde(default)]
    pub pub_sub: bool,
}

/// Protocol and serialization catalog.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub protocols: Vec<ProtocolConfig>,
    pub serializations: Vec<String>,
}

impl Config {
    /// Load configuration from `orchestrator.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("ORCHESTRATOR_CONFIG").unwrap_or_else(|_| "orchestrator.toml".into());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORCHESTRATOR_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("ORCHESTRATOR_MAX_ATTEMPTS")
            && let Ok(attempts) = val.parse()
        {
            self.engine.max_attempts = attempts;
        }
        if let Ok(val) = std::env::var("ORCHESTRATOR_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_attempts must be non-zero".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for name in self.catalog.protocols.iter().map(|p| p.name.as_str()) {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "protocol names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Validation(format!(
                    "protocol {name:?} is listed twice"
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for name in &self.catalog.serializations {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "serialization names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Validation(format!(
                    "serialization {name:?} is listed twice"
                )));
            }
        }
        Ok(())
    }

    /// Storage adapter settings.
    #[must_use]
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            database_url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    /// Retry bound for conflicting units of work.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.engine.max_attempts,
        }
    }

    /// The protocol and serialization catalog.
    #[must_use]
    pub fn catalog(&self) -> StaticCatalog {
        StaticCatalog::new(
            self.catalog.protocols.iter().map(|p| Protocol {
                name: p.name.clone(),
                pub_sub: p.pub_sub,
            }),
            self.catalog.serializations.iter().map(|name| Serialization {
                name: name.clone(),
            }),
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:orchestrator.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "orchestratord=info,orchestrator=info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::default().max_attempts,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let protocol = |name: &str, pub_sub| ProtocolConfig {
            name: name.to_string(),
            pub_sub,
        };
        Self {
            protocols: vec![
                protocol("HTTP", false),
                protocol("HTTPS", false),
                protocol("CoAP", false),
                protocol("MQTT", true),
                protocol("AMQP", true),
            ],
            serializations: ["JSON", "CBOR", "XML"].map(String::from).to_vec(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_app::ports::Catalog;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:orchestrator.db?mode=rwc");
        assert_eq!(config.engine.max_attempts, 3);
        assert!(config.devices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_attempts, 3);
        assert_eq!(config.catalog.protocols.len(), 5);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = r#"
            [database]
            url = 'sqlite:test.db'
            max_connections = 2

            [logging]
            filter = 'debug'

            [engine]
            max_attempts = 5

            [catalog]
            protocols = [
                { name = "HTTPS" },
                { name = "MQTT", pub_sub = true },
            ]
            serializations = ["JSON"]

            [[devices]]
            name = "plc-7"
            multi_actuator = true

            [[devices.transports]]
            host = "10.0.0.7"
            port = 443
            protocol = "HTTPS"
            serializations = ["JSON"]

            [[devices.actuators]]
            name = "slpf-7"
            schema = { meta = { title = "Stateless Packet Filter" }, types = [] }
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].transports[0].port, 443);
        assert_eq!(
            config.devices[0].actuators[0].schema["meta"]["title"],
            serde_json::json!("Stateless Packet Filter")
        );

        let catalog = config.catalog();
        assert_eq!(
            catalog.protocol("MQTT").map(|p| p.pub_sub),
            Some(true)
        );
        assert!(catalog.protocol("HTTP").is_none());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.engine.max_attempts, 3);
    }

    #[test]
    fn should_reject_zero_attempts() {
        let mut config = Config::default();
        config.engine.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_duplicate_protocol() {
        let mut config = Config::default();
        config.catalog.protocols.push(ProtocolConfig {
            name: "HTTP".to_string(),
            pub_sub: false,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn should_reject_empty_serialization_name() {
        let mut config = Config::default();
        config.catalog.serializations.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_map_storage_settings() {
        let config = Config::default();
        let storage = config.storage();
        assert_eq!(storage.database_url, "sqlite:orchestrator.db?mode=rwc");
        assert_eq!(storage.max_connections, 5);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
