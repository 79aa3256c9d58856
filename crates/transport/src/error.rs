//! Error type shared by every transport.
//!
//! `TransferError` folds together the failure modes of both delivery paths:
//! endpoint misconfiguration, MQTT client/connection failures, WebSocket
//! failures. The publisher treats every variant as fatal
//! for the current tick; whether the run survives depends on the retry policy.
//!
//! # Error Categories
//!
//! **Configuration** (caught before the first tick):
//! - `ClientSetup`, `InvalidEndpoint`, `InvalidQos`, `ConfigError`
//!
//! **Runtime** (connection or delivery):
//! - `ClientTransfer`, `ClientConnection`, `WebSocket`, `ChannelClosed`,
//!   `NotConnected`, `Timeout`

use std::time::Duration;

use thiserror::Error;

/// The unified error type for transport operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The client could not be assembled from its configuration.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Host, port or URL cannot be used to reach a peer.
    ///
    /// Typically an empty host or a WebSocket URL with a non-`ws` scheme.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// QoS outside of 0, 1 or 2.
    #[error("Invalid QoS value {0}, must be 0, 1, or 2")]
    InvalidQos(u8),

    /// Configuration validation failed.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// The MQTT client could not queue a request.
    ///
    /// Happens when the event loop has already been dropped.
    #[cfg(feature = "mqtt")]
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// The broker was unreachable, refused the CONNECT or dropped the session.
    ///
    /// Boxed to keep the enum small.
    #[cfg(feature = "mqtt")]
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// Handshake, framing or IO failure on the WebSocket.
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// The peer closed the duplex channel.
    #[error("Channel closed by peer")]
    ChannelClosed,

    /// An operation needed an open channel but `connect` has not succeeded.
    #[error("Transport is not connected")]
    NotConnected,

    /// A network operation did not finish within its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(feature = "mqtt")]
impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for TransferError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransferError::WebSocket(Box::new(err))
    }
}

impl TransferError {
    /// Returns true when the failure means the duplex channel is gone and a
    /// new `connect` is needed before anything else can be sent.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransferError::ChannelClosed | TransferError::NotConnected => true,
            #[cfg(feature = "websocket")]
            TransferError::WebSocket(e) => matches!(
                **e,
                tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::AlreadyClosed
                    | tokio_tungstenite::tungstenite::Error::Io(_)
            ),
            _ => false,
        }
    }
}
