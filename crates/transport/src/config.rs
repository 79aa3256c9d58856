//! Transport configuration: endpoint, credentials and retry policy.
//!
//! All structures deserialize with `serde` (the sensor binary reads them
//! from the `[transport]` table of its TOML file) and validate with the
//! `validator` crate, so a bad endpoint is rejected before the first tick.
//!
//! ```toml
//! [transport]
//! kind = "mqtt"
//! host = "broker.example.com"
//! port = 1883
//! topic = "sensate/measurements"
//! qos = 0
//!
//! [transport.credentials]
//! username = "sensor"
//! password = "secret"
//!
//! [transport.retry]
//! enabled = true
//! max_attempts = 5
//! ```

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::error::TransferError;

/// Broker port used when none is configured.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Topic the collector listens on.
pub const DEFAULT_TOPIC: &str = "sensate/measurements";

/// Which delivery mechanism the publisher drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One connect/publish/disconnect cycle per measurement.
    #[default]
    Mqtt,
    /// One long-lived socket, one frame out and one frame in per measurement.
    #[serde(alias = "ws")]
    Websocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Mqtt => write!(f, "mqtt"),
            TransportKind::Websocket => write!(f, "websocket"),
        }
    }
}

/// Broker login sent in the MQTT CONNECT packet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "Username must not be empty"))]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Optional bounded retry around connect and deliver.
///
/// Disabled by default: a failed delivery ends the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,

    /// Retries after the first failure, not counting the first attempt.
    #[validate(range(max = 100, message = "Max attempts must not exceed 100"))]
    pub max_attempts: u32,

    #[validate(range(min = 1, message = "Initial delay must be at least 1 ms"))]
    pub initial_delay_ms: u64,

    #[validate(range(min = 1, message = "Max delay must be at least 1 ms"))]
    pub max_delay_ms: u64,

    #[validate(range(min = 1.0, max = 10.0, message = "Multiplier must be between 1.0 and 10.0"))]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

/// Endpoint and delivery settings for either transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub kind: TransportKind,

    /// Broker hostname for MQTT; hostname or full `ws://`/`wss://` URL for
    /// WebSocket.
    #[validate(length(min = 1, max = 255, message = "Host must be between 1 and 255 characters"))]
    pub host: String,

    /// Broker port, MQTT only. Defaults to 1883.
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: Option<u16>,

    /// Topic measurements are published to, MQTT only.
    #[validate(custom(function = "validate_topic"))]
    pub topic: String,

    /// Publish QoS, MQTT only.
    #[validate(range(max = 2, message = "QoS must be 0, 1, or 2"))]
    pub qos: u8,

    /// MQTT client id. Empty means a random UUID per connection.
    #[validate(length(max = 36, message = "Client ID must not exceed 36 characters"))]
    pub client_id: String,

    #[validate(range(min = 5, max = 3600, message = "Keep alive must be between 5 and 3600 seconds"))]
    pub keep_alive: u64,

    /// Deadline in seconds for one connection attempt or broker round trip.
    #[validate(range(min = 1, max = 300, message = "Connection timeout must be between 1 and 300 seconds"))]
    pub connection_timeout: u64,

    /// Deadline in seconds for a WebSocket reply. Absent means wait forever.
    #[validate(range(min = 1, message = "Reply timeout must be at least 1 second"))]
    pub reply_timeout: Option<u64>,

    /// Broker login, MQTT only. Absent means an anonymous connection.
    #[validate(nested)]
    pub credentials: Option<Credentials>,

    #[validate(nested)]
    pub retry: RetryConfig,
}

fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        let mut err = ValidationError::new("empty_topic");
        err.message = Some("Topic must not be empty".into());
        return Err(err);
    }
    if topic.contains(['+', '#']) {
        let mut err = ValidationError::new("wildcard_topic");
        err.message = Some(format!("Topic must not contain wildcards: {}", topic).into());
        return Err(err);
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            host: String::new(),
            port: None,
            topic: DEFAULT_TOPIC.to_string(),
            qos: 0,
            client_id: String::new(),
            keep_alive: 60,
            connection_timeout: 30,
            reply_timeout: None,
            credentials: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Broker port, falling back to 1883.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_MQTT_PORT)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout.map(Duration::from_secs)
    }

    /// Client id for the next broker connection.
    pub fn client_id(&self) -> String {
        if self.client_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.client_id.clone()
        }
    }

    /// URL for the duplex channel.
    ///
    /// A bare host gets a `ws://` prefix; `ws://` and `wss://` URLs are used
    /// as given.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoint` for an empty host or any other scheme.
    pub fn websocket_url(&self) -> Result<String, TransferError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(TransferError::InvalidEndpoint("host is empty".into()));
        }
        match host.split_once("://") {
            None => Ok(format!("ws://{}", host)),
            Some(("ws", _)) | Some(("wss", _)) => Ok(host.to_string()),
            Some((scheme, _)) => Err(TransferError::InvalidEndpoint(format!(
                "unsupported WebSocket scheme '{}' in {}",
                scheme, host
            ))),
        }
    }
}
