// bridge-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Handshake failures, rendered as JSON error bodies.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("missing or invalid surface token")]
    Unauthorized,

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid host kind: {0}")]
    InvalidHostKind(String),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session {0} belongs to a different origin")]
    OriginMismatch(Uuid),

    #[error("session registry unavailable: {0}")]
    Mailbox(#[from] actix::MailboxError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::InvalidSessionId(_) | ServerError::InvalidHostKind(_) => StatusCode::BAD_REQUEST,
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::OriginMismatch(_) => StatusCode::FORBIDDEN,
            ServerError::Mailbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
