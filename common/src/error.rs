// common/src/error.rs
use thiserror::Error;

/// Errors raised while encoding or decoding bridge traffic.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),

    #[error("invalid injected script: {0}")]
    InvalidScript(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
