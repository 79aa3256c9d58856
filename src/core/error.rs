use sensate_transport::TransferError;
use thiserror::Error;

/// Everything that stops the publisher loop.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Connect, deliver or receive failed (after retries, when enabled).
    #[error("Transport error: {0}")]
    Transport(#[from] TransferError),

    #[error("Failed to serialize measurement: {0}")]
    Serialization(#[from] serde_json::Error),
}
