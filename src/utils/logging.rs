//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber from [`LoggingConfig`]. `RUST_LOG`
//! takes precedence over the configured level when set.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()))
}

/// Console goes to stderr; with both outputs enabled every event is teed
fn make_writer(config: &LoggingConfig) -> Result<BoxMakeWriter> {
    if !config.log_to_file {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    }

    let path = config.log_file_path.as_deref().ok_or_else(|| {
        ProtocolError::ConfigError(
            "log_file_path must be specified when log_to_file is true".to_string(),
        )
    })?;
    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?,
    );

    if config.log_to_console {
        Ok(BoxMakeWriter::new(file.and(std::io::stderr)))
    } else {
        Ok(BoxMakeWriter::new(file))
    }
}

/// Install the global subscriber.
///
/// Fails if the configuration is invalid or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ProtocolError::ConfigError(errors.join("; ")));
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(make_writer(config)?)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;
    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let config = LoggingConfig {
            log_to_console: false,
            log_to_file: false,
            ..Default::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(ProtocolError::ConfigError(_))
        ));
    }

    fn write_event(writer: &BoxMakeWriter, line: &str) {
        use std::io::Write;
        use tracing_subscriber::fmt::MakeWriter;
        let mut w = writer.make_writer();
        w.write_all(line.as_bytes()).unwrap();
        w.flush().unwrap();
    }

    #[test]
    fn test_file_output_kept_alongside_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("both.log");
        let config = LoggingConfig {
            log_to_console: true,
            log_to_file: true,
            log_file_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let writer = make_writer(&config).unwrap();
        write_event(&writer, "teed event\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "teed event\n");
    }

    #[test]
    fn test_file_only_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.log");
        let config = LoggingConfig {
            log_to_console: false,
            log_to_file: true,
            log_file_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let writer = make_writer(&config).unwrap();
        write_event(&writer, "file event\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "file event\n");
    }

    #[test]
    fn test_filter_uses_configured_level() {
        let config = LoggingConfig {
            log_level: tracing::Level::DEBUG,
            ..Default::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter(&config).to_string(), "debug");
        }
    }
}
