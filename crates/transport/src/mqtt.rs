//! Fire-and-forget broker delivery.
//!
//! Every `deliver` call is a complete MQTT session: TCP connect, CONNECT
//! (with credentials when configured), PUBLISH, wait until the publish has
//! left the client (QoS 0) or been acknowledged (QoS 1/2), DISCONNECT. No
//! session survives between measurements, which mirrors how a one-shot
//! publish helper behaves and keeps a broker restart from wedging the loop.
//!
//! ```text
//! connect ──> CONNACK ──> PUBLISH ──(flushed | PUBACK | PUBCOMP)──> DISCONNECT
//! ```

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tracing::{debug, trace};
use validator::Validate;

use super::{config::Config, error::TransferError, transport::Transport, Result};

/// Capacity of the request channel. One publish and one disconnect are all a
/// session ever queues.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Builder for a single-use MQTT client.
///
/// Wraps `rumqttc::MqttOptions` and remembers whether a login was attached,
/// so callers and tests can tell an authenticated CONNECT from an anonymous
/// one without poking into rumqttc internals.
pub struct ClientBuilder {
    opts: MqttOptions,
    cap: usize,
    authenticated: bool,
}

impl ClientBuilder {
    /// Creates a builder for an anonymous, clean-session client.
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16, cap: usize) -> Self {
        let mut opts = MqttOptions::new(client_id, host, port);
        opts.set_clean_session(true);
        Self {
            opts,
            cap,
            authenticated: false,
        }
    }

    /// Creates a builder from transport configuration.
    ///
    /// Credentials are attached only when the configuration carries them.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoint` when the host is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(TransferError::InvalidEndpoint("broker host is empty".into()));
        }

        let mut builder = Self::new(
            config.client_id(),
            config.host.trim(),
            config.port(),
            REQUEST_CHANNEL_CAPACITY,
        )
        .keep_alive(config.keep_alive);

        if let Some(credentials) = &config.credentials {
            builder = builder.credentials(&credentials.username, &credentials.password);
        }

        Ok(builder)
    }

    /// Sets the keep-alive interval in seconds.
    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    /// Attaches a username and password to the CONNECT packet.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.set_credentials(username, password);
        self.authenticated = true;
        self
    }

    /// Whether `credentials` was called.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Consumes the builder and returns the client with its event loop.
    ///
    /// Nothing touches the network until the event loop is polled.
    pub fn build(self) -> (AsyncClient, EventLoop) {
        AsyncClient::new(self.opts, self.cap)
    }
}

/// Maps a configured QoS level onto rumqttc's enum.
pub fn qos_from_u8(qos: u8) -> Result<QoS> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransferError::InvalidQos(other)),
    }
}

/// Broker transport: one MQTT session per measurement.
#[derive(Debug, Clone)]
pub struct MqttTransport {
    config: Config,
    qos: QoS,
}

impl MqttTransport {
    /// Validates the configuration and prepares the transport.
    ///
    /// No connection is opened here.
    ///
    /// # Errors
    ///
    /// `ConfigError` or `InvalidQos` for an unusable configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let qos = qos_from_u8(config.qos)?;
        Ok(Self { config, qos })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builder for the next session.
    pub fn client_builder(&self) -> Result<ClientBuilder> {
        ClientBuilder::from_config(&self.config)
    }

    /// Runs one connect/publish/disconnect session to completion.
    async fn publish_once(&self, payload: &str) -> Result<()> {
        let builder = self.client_builder()?;
        debug!(
            "Connecting to broker {}:{} (authenticated: {})",
            self.config.host,
            self.config.port(),
            builder.is_authenticated()
        );
        let (client, mut event_loop) = builder.build();

        client
            .publish(
                self.config.topic.as_str(),
                self.qos,
                false,
                payload.as_bytes().to_vec(),
            )
            .await?;

        let mut disconnecting = false;
        loop {
            let event = event_loop.poll().await?;
            let delivered = match &event {
                Event::Incoming(Packet::ConnAck(ack)) => {
                    trace!("CONNACK received: {:?}", ack.code);
                    false
                }
                Event::Outgoing(Outgoing::Publish(pkid)) => {
                    trace!("PUBLISH written (pkid {})", pkid);
                    self.qos == QoS::AtMostOnce
                }
                Event::Incoming(Packet::PubAck(_)) => self.qos == QoS::AtLeastOnce,
                Event::Incoming(Packet::PubComp(_)) => self.qos == QoS::ExactlyOnce,
                Event::Outgoing(Outgoing::Disconnect) => {
                    debug!("Published {} bytes to '{}'", payload.len(), self.config.topic);
                    return Ok(());
                }
                other => {
                    trace!("MQTT event: {:?}", other);
                    false
                }
            };

            if delivered && !disconnecting {
                disconnecting = true;
                client.disconnect().await?;
            }
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn deliver(&mut self, payload: &str) -> Result<()> {
        let deadline = self.config.connection_timeout();
        tokio::time::timeout(deadline, self.publish_once(payload))
            .await
            .map_err(|_| TransferError::Timeout(deadline))?
    }
}
