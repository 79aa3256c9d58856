//! Application configuration: loading, command-line overrides, validation.
//!
//! Sources, highest precedence first:
//!
//! 1. command-line flags
//! 2. the TOML file named by `--config` / `SENSATE_SENSOR_CONFIG`, or
//!    `/etc/sensate/sensor.toml` when it exists
//! 3. built-in defaults
//!
//! The merged configuration is validated once and is not changed afterwards.
//!
//! ```toml
//! [sensor]
//! id = "5c7c3bbd80e8ae3154d04912"
//! secret = "Test"
//! interval_ms = 1000
//!
//! [transport]
//! kind = "mqtt"
//! host = "localhost"
//!
//! [transport.credentials]
//! username = "sensate"
//! password = "sensate"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cli::Cli;

pub mod logger;
pub mod sensor;

pub use logger::LoggerConfig;
pub use sensor::SensorConfig;

pub type TransportConfig = sensate_transport::Config;

/// Configuration file used when neither `--config` nor
/// `SENSATE_SENSOR_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sensate/sensor.toml";

/// Wall-clock timestamp for messages printed before logging is up.
#[doc(hidden)]
pub fn early_timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[doc(hidden)]
#[macro_export]
macro_rules! __print_status {
    ($print:ident, $label:expr, $($arg:tt)*) => {
        $print!("{}  {} {}",
            console::style($crate::config::early_timestamp()).dim(),
            $label,
            format_args!($($arg)*)
        )
    };
}

/// Timestamped status lines for the time before the tracing subscriber is
/// installed (configuration loading, logger setup).
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        $crate::__print_status!(println, console::style("INFO").green(), $($arg)*)
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        $crate::__print_status!(println, console::style("WARN").yellow(), $($arg)*)
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::__print_status!(eprintln, console::style("ERROR").red(), $($arg)*)
    };
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub logger: LoggerConfig,

    #[validate(nested)]
    pub sensor: SensorConfig,

    #[validate(nested)]
    pub transport: TransportConfig,
}

impl Config {
    /// Builds the effective configuration for a command line.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the file cannot be read or parsed, or when the
    /// merged result is invalid (for example no host, id or secret).
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match Self::get_config_path(cli.config.as_deref())? {
            Some(path) => Self::read(&path)?,
            None => {
                print_info!("No configuration file, using defaults and command line");
                Config::default()
            }
        };

        cli.apply(&mut config);
        config.check()?;
        Ok(config)
    }

    /// Picks the configuration file.
    ///
    /// An explicit path must exist; the default path is used only if it
    /// does.
    fn get_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(Some(fallback.to_path_buf()));
        }

        Ok(None)
    }

    /// Loads and validates a configuration file on its own.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let config = Self::read(path)?;
        config.check()?;
        Ok(config)
    }

    /// Parses a file without validating it, so flags can still fill gaps.
    fn read(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates every section.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.transport.kind == sensate_transport::TransportKind::Websocket {
            if self.transport.port.is_some() {
                print_warn!("transport.port is ignored by the WebSocket transport");
            }
            self.transport
                .websocket_url()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }
}
