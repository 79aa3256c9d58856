//! The delivery seam between the publisher loop and the network.

use async_trait::async_trait;

use super::Result;

/// A way of getting one serialized measurement to the collector.
///
/// The publisher calls `connect` once before the first tick, then for every
/// tick `deliver` followed by `receive` when `expects_reply` is true, and
/// `disconnect` on shutdown. Every call is awaited to completion before the
/// next one starts, so implementations never see overlapping operations.
#[async_trait]
pub trait Transport: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Opens whatever long-lived resources the transport needs.
    ///
    /// Transports that connect per delivery leave this as a no-op.
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Sends one payload.
    async fn deliver(&mut self, payload: &str) -> Result<()>;

    /// Whether each delivery must be followed by exactly one `receive`.
    fn expects_reply(&self) -> bool {
        false
    }

    /// Waits for the peer's response to the last delivery.
    ///
    /// Returns `Ok(None)` for transports without a reply channel.
    async fn receive(&mut self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Whether `deliver` can be called without a prior `connect`.
    fn is_connected(&self) -> bool {
        true
    }

    /// Releases the transport's resources. Best effort.
    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn connect(&mut self) -> Result<()> {
        (**self).connect().await
    }

    async fn deliver(&mut self, payload: &str) -> Result<()> {
        (**self).deliver(payload).await
    }

    fn expects_reply(&self) -> bool {
        (**self).expects_reply()
    }

    async fn receive(&mut self) -> Result<Option<String>> {
        (**self).receive().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect().await
    }
}
