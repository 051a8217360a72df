//! # Configuration Management
//!
//! Centralized configuration for the SFTP wire layer.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Security Considerations
//! - `max_packet_size` bounds the allocation made for any single inbound frame
//! - `max_in_flight` bounds how many handlers a single peer can keep busy

use crate::core::extended::{ExtensionPair, STATVFS_EXTENSION, STATVFS_EXTENSION_VERSION};
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Highest protocol version implemented
pub const PROTOCOL_VERSION: u32 = 3;

/// Default cap on an inbound frame payload (256 KB)
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Smallest packet size every implementation must accept
pub const MIN_PACKET_SIZE: usize = 34_000;

/// Default number of concurrently executing request handlers
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Server-side session settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("SFTP_WIRE_MAX_PACKET_SIZE") {
            config.server.max_packet_size = size.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid SFTP_WIRE_MAX_PACKET_SIZE: {e}"))
            })?;
        }

        if let Ok(limit) = std::env::var("SFTP_WIRE_MAX_IN_FLIGHT") {
            config.server.max_in_flight = limit.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid SFTP_WIRE_MAX_IN_FLIGHT: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("SFTP_WIRE_SHUTDOWN_TIMEOUT_MS") {
            let millis = timeout.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid SFTP_WIRE_SHUTDOWN_TIMEOUT_MS: {e}"))
            })?;
            config.server.shutdown_timeout = Duration::from_millis(millis);
        }

        if let Ok(level) = std::env::var("SFTP_WIRE_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid SFTP_WIRE_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Per-session server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Largest inbound frame payload accepted, in bytes
    pub max_packet_size: usize,

    /// Maximum number of requests being handled at once
    pub max_in_flight: usize,

    /// Highest version offered in VERSION
    pub protocol_version: u32,

    /// How long to wait for in-flight handlers once the peer has hung up
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Extensions advertised in VERSION
    #[serde(default)]
    pub extensions: Vec<ExtensionPair>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_packet_size: MAX_PAYLOAD_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            protocol_version: PROTOCOL_VERSION,
            shutdown_timeout: Duration::from_secs(10),
            extensions: vec![ExtensionPair::new(
                STATVFS_EXTENSION,
                STATVFS_EXTENSION_VERSION,
            )],
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_packet_size < MIN_PACKET_SIZE {
            errors.push(format!(
                "Max packet size too small: {} bytes (minimum: {MIN_PACKET_SIZE})",
                self.max_packet_size
            ));
        } else if self.max_packet_size > 64 * 1024 * 1024 {
            errors.push(format!(
                "Max packet size too large: {} bytes (maximum: 64 MB)",
                self.max_packet_size
            ));
        }

        if self.max_in_flight == 0 {
            errors.push("Max in-flight requests must be greater than 0".to_string());
        } else if self.max_in_flight > 65_536 {
            errors.push(format!(
                "Max in-flight requests too large: {} (maximum: 65536)",
                self.max_in_flight
            ));
        }

        if self.protocol_version == 0 || self.protocol_version > PROTOCOL_VERSION {
            errors.push(format!(
                "Unsupported protocol version: {} (supported: 1-{PROTOCOL_VERSION})",
                self.protocol_version
            ));
        }

        for ext in &self.extensions {
            if ext.name.is_empty() {
                errors.push("Extension name cannot be empty".to_string());
            }
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("sftp-wire"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
