//! # sensate-transport: measurement delivery for the Sensate IoT sensor simulator
//!
//! Two interchangeable ways of getting a serialized measurement to the
//! ingestion backend, both behind the [`Transport`] trait:
//!
//! | Transport | Session | Reply |
//! |-----------|---------|-------|
//! | [`MqttTransport`] | connect/publish/disconnect per message | none |
//! | [`WebSocketTransport`] | one socket for the whole run | one frame per message |
//!
//! The variant is picked at runtime from [`Config::kind`] by [`from_config`].
//! Each is compiled in by a cargo feature (`mqtt`, `websocket`), both on by
//! default.
//!
//! # Quick Start
//!
//! ```ignore
//! use sensate_transport::{Config, TransportKind};
//!
//! let config = Config {
//!     kind: TransportKind::Mqtt,
//!     host: "broker.example.com".into(),
//!     ..Default::default()
//! };
//! let mut transport = sensate_transport::from_config(&config)?;
//! transport.connect().await?;
//! transport.deliver(r#"{"Longitude":4.7769}"#).await?;
//! transport.disconnect().await?;
//! ```
//!
//! # Failure Policy
//!
//! Transports never retry on their own. Every failure is returned as a
//! [`TransferError`]; the caller decides whether to give up (the default) or
//! to retry with a [`Backoff`] built from [`RetryConfig`].

pub mod backoff;
pub mod config;
pub mod error;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use backoff::{Backoff, BackoffError};
pub use config::{Config, Credentials, RetryConfig, TransportKind, DEFAULT_MQTT_PORT, DEFAULT_TOPIC};
pub use error::TransferError;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;
pub use transport::Transport;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Builds the transport selected by `config.kind`.
///
/// # Errors
///
/// - `ClientSetup` when the selected transport was not compiled in
/// - any construction error of the transport itself (invalid endpoint or QoS)
pub fn from_config(config: &Config) -> Result<Box<dyn Transport>> {
    match config.kind {
        #[cfg(feature = "mqtt")]
        TransportKind::Mqtt => Ok(Box::new(MqttTransport::new(config.clone())?)),
        #[cfg(feature = "websocket")]
        TransportKind::Websocket => Ok(Box::new(WebSocketTransport::new(config)?)),
        #[allow(unreachable_patterns)]
        other => Err(TransferError::ClientSetup(format!(
            "transport '{}' is not compiled in, enable the '{}' feature",
            other,
            match other {
                TransportKind::Mqtt => "mqtt",
                TransportKind::Websocket => "websocket",
            }
        ))),
    }
}
