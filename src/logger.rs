//! Global `tracing` subscriber setup.
//!
//! `LoggerManager` turns a validated `LoggerConfig` into a registry with a
//! console layer and, on systemd hosts, a journald layer. Each layer gets its
//! own `EnvFilter`: `RUST_LOG` when set, the configured level otherwise.

use std::io;

use thiserror::Error;
use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, prelude::*, EnvFilter, Layer, Registry,
};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig, TimestampFormat},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to install global subscriber: {0}")]
    InitializationError(String),

    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// journald was requested as the only output and could not be opened.
    #[error("Failed to initialize journald logger and console output is disabled")]
    JournaldUnavailable,
}

pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Validates the configuration. Nothing is installed yet.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Installs the global subscriber. Call once, before the first event.
    ///
    /// A journald failure is tolerated while console output is still on.
    ///
    /// # Errors
    ///
    /// `NoLayersConfigured` when every output is disabled,
    /// `JournaldUnavailable` when journald was the only output and failed,
    /// `InitializationError` when a global subscriber is already set.
    pub fn init(&self) -> Result<(), LoggerError> {
        let layers = self.layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    /// Builds the configured output layers.
    pub fn layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        let console = self.config.console.as_ref().filter(|c| c.enabled);
        if let Some(console) = console {
            layers.push(self.console_layer(console));
        }

        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.journald_layer(journald) {
                Ok(layer) => {
                    layers.push(layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if console.is_none() {
                        return Err(LoggerError::JournaldUnavailable);
                    }
                }
            }
        }

        if layers.is_empty() {
            return Err(LoggerError::NoLayersConfigured);
        }
        Ok(layers)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    fn console_layer(&self, config: &ConsoleConfig) -> BoxedLayer {
        let span_events = if config.show_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let filter = self.filter();
        let timestamps = self.config.timestamp_format;

        macro_rules! finish {
            ($layer:expr) => {{
                let layer = $layer
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_span_events(span_events)
                    .with_ansi(config.ansi_colors)
                    .with_writer(io::stdout);
                match timestamps {
                    TimestampFormat::Rfc3339 => layer.with_filter(filter).boxed(),
                    TimestampFormat::Uptime => layer
                        .with_timer(fmt::time::uptime())
                        .with_filter(filter)
                        .boxed(),
                    TimestampFormat::None => layer.without_time().with_filter(filter).boxed(),
                }
            }};
        }

        match config.format {
            LogFormat::Json => finish!(fmt::layer().json()),
            LogFormat::Pretty => finish!(fmt::layer().pretty()),
            LogFormat::Compact => finish!(fmt::layer().compact()),
        }
    }

    fn journald_layer(&self, config: &JournaldConfig) -> Result<BoxedLayer, LoggerError> {
        let layer = tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
        Ok(layer.with_filter(self.filter()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_level() {
        let config = LoggerConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_default_builds_console_layer() {
        let manager = LoggerManager::new(LoggerConfig::default()).unwrap();
        assert_eq!(manager.layers().unwrap().len(), 1);
    }

    #[test]
    fn test_every_format_builds() {
        for format in [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json] {
            for timestamp_format in [
                TimestampFormat::Rfc3339,
                TimestampFormat::Uptime,
                TimestampFormat::None,
            ] {
                let manager = LoggerManager::new(LoggerConfig {
                    timestamp_format,
                    console: Some(ConsoleConfig {
                        format,
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .unwrap();
                assert_eq!(manager.layers().unwrap().len(), 1);
            }
        }
    }

    #[test]
    fn test_no_outputs_is_an_error() {
        let manager = LoggerManager::new(LoggerConfig {
            console: Some(ConsoleConfig {
                enabled: false,
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            manager.layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }
}
