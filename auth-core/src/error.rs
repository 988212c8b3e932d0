use thiserror::Error;

/// Failure to hand a message to the host context.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host context unavailable: {0}")]
    HostUnavailable(String),

    #[error("failed to serialize bridge message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to encode native envelope: {0}")]
    Encoding(#[from] common::CommonError),

    #[error("delivery failed: {0}")]
    Delivery(String),
}
