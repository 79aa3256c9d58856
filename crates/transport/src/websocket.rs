//! Persistent duplex delivery over a WebSocket.
//!
//! The channel is opened once by `connect`. Each tick writes one text frame
//! and then reads exactly one data frame back; control frames are skipped.
//! A dropped channel is reported, never silently reopened.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use super::{config::Config, error::TransferError, transport::Transport, Result};

type Channel = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Duplex transport: one socket for the whole run.
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
    reply_timeout: Option<Duration>,
    channel: Option<Channel>,
}

impl WebSocketTransport {
    /// Resolves the endpoint URL. Does not connect.
    ///
    /// Broker credentials and port have no meaning here and are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoint` when the host cannot be turned into a `ws://` or
    /// `wss://` URL.
    pub fn new(config: &Config) -> Result<Self> {
        let url = config.websocket_url()?;
        if config.credentials.is_some() {
            warn!("Broker credentials are ignored by the WebSocket transport");
        }
        Ok(Self {
            url,
            connect_timeout: config.connection_timeout(),
            reply_timeout: config.reply_timeout(),
            channel: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn channel(&mut self) -> Result<&mut Channel> {
        self.channel.as_mut().ok_or(TransferError::NotConnected)
    }

    /// Reads frames until a data frame arrives.
    async fn next_reply(&mut self) -> Result<String> {
        let channel = self.channel()?;
        loop {
            match channel.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Peer closed the channel: {:?}", frame);
                    return Err(TransferError::ChannelClosed);
                }
                Some(Ok(other)) => trace!("Skipping control frame: {:?}", other),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransferError::ChannelClosed),
            }
        }
    }

    /// Drops the channel after a failure so `is_connected` reports the truth.
    fn forget_on_disconnect<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_disconnect() {
                self.channel = None;
            }
        }
        result
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }
        debug!("Opening WebSocket channel to {}", self.url);
        let (channel, response) = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransferError::Timeout(self.connect_timeout))??;
        info!("WebSocket channel open ({})", response.status());
        self.channel = Some(channel);
        Ok(())
    }

    async fn deliver(&mut self, payload: &str) -> Result<()> {
        let result = match self.channel() {
            Ok(channel) => channel
                .send(Message::Text(payload.to_owned()))
                .await
                .map_err(TransferError::from),
            Err(e) => Err(e),
        };
        self.forget_on_disconnect(result)
    }

    fn expects_reply(&self) -> bool {
        true
    }

    async fn receive(&mut self) -> Result<Option<String>> {
        let result = match self.reply_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.next_reply())
                .await
                .unwrap_or(Err(TransferError::Timeout(deadline))),
            None => self.next_reply().await,
        };
        self.forget_on_disconnect(result).map(Some)
    }

    fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close(None).await {
                debug!("Error closing WebSocket channel: {}", e);
            }
        }
        Ok(())
    }
}
