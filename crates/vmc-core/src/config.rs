//! Configuration loading and typed config structures for the controller.
//!
//! The configuration lives in an optional `vmc-config.yaml`. Every field
//! has a default matching the behaviour the ordering application was
//! built against (port 3002, 5 second vend), so running without a file
//! is the normal development setup.
//!
//! After parsing, a handful of environment variables override the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `HOST` | `server.host` |
//! | `PORT` | `server.port` |
//! | `VEND_DELAY_MS` | `vending.delay_ms` |

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held a value that could not be parsed.
    #[error("invalid value for {var}: {message}")]
    InvalidEnv {
        /// Name of the offending variable.
        var: &'static str,
        /// Parse failure description.
        message: String,
    },

    /// A parsed value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
///
/// Mirrors the structure of `vmc-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VmcConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Vend timing.
    #[serde(default)]
    pub vending: VendingConfig,

    /// Push-channel fan-out settings.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Log filter defaults.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VmcConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, and the errors of
    /// [`apply_env_overrides`](Self::apply_env_overrides) and
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// an override/validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    ///
    /// # Errors
    ///
    /// Returns an override or validation error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST`, `PORT` and `VEND_DELAY_MS` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric variable does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric variable does not parse.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("PORT") {
            self.server.port = val.trim().parse().map_err(|e| ConfigError::InvalidEnv {
                var: "PORT",
                message: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("VEND_DELAY_MS") {
            self.vending.delay_ms = val.trim().parse().map_err(|e| ConfigError::InvalidEnv {
                var: "VEND_DELAY_MS",
                message: format!("{e}"),
            })?;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the vend delay or the
    /// subscriber buffer is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vending.delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "vending.delay_ms must be greater than 0".to_owned(),
            ));
        }
        if self.notifications.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid(
                "notifications.subscriber_buffer must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Vend timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VendingConfig {
    /// Milliseconds between admitting a vend and completing it.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl VendingConfig {
    /// The vend delay as a [`Duration`].
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for VendingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

/// Push-channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    /// Frames queued per subscriber before further frames are dropped
    /// for that subscriber.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3002
}

const fn default_delay_ms() -> u64 {
    5000
}

const fn default_subscriber_buffer() -> usize {
    64
}

fn default_log_level() -> String {
    String::from("info")
}
