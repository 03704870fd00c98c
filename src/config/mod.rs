//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

use serde::Deserialize;

use crate::bus::AmqpConfig;
use crate::dispatch::DispatchConfig;
use crate::forward::ForwarderConfig;
use crate::logger::LoggerConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "LOGRELAY_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "LOGRELAY";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "LOGRELAY_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection and topology.
    pub amqp: AmqpConfig,
    /// Per-message dispatch.
    pub dispatch: DispatchConfig,
    /// Delivery to the logging service.
    pub forwarder: ForwarderConfig,
    /// Logging service ingress.
    pub logger: LoggerConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `LOGRELAY__AMQP__URL` or `LOGRELAY__AMQP__ROUTING_KEYS=log.INFO,log.ERROR`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config: Config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("amqp.routing_keys")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amqp.url.is_empty() {
            return Err(ConfigError::Invalid("amqp.url must not be empty".to_string()));
        }

        if self.amqp.exchange.is_empty() {
            return Err(ConfigError::Invalid(
                "amqp.exchange must not be empty".to_string(),
            ));
        }

        if self.dispatch.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_in_flight must be at least 1".to_string(),
            ));
        }

        if self.forwarder.http.timeout.is_zero() || self.forwarder.rpc.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "forwarder timeouts must be at least one second".to_string(),
            ));
        }

        let endpoint = &self.forwarder.http.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "forwarder.http.endpoint must start with http:// or https://, got '{}'",
                endpoint
            )));
        }

        Ok(())
    }
}
