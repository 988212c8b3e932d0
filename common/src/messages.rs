// Common Crate - messages.rs
// common/src/messages.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::new_correlation_id;

/// JSON-RPC style provider code for "user rejected the request".
pub const USER_CANCELLED_CODE: i64 = -32002;
/// A pending request displaced by a newer one. Kept apart from
/// `USER_CANCELLED_CODE` so hosts never report it as a user rejection.
pub const REQUEST_SUPERSEDED_CODE: i64 = -32003;
/// EIP-1193 code for a method the surface does not handle.
pub const UNSUPPORTED_METHOD_CODE: i64 = 4200;

pub const USER_CANCELLED_MESSAGE: &str = "User cancelled.";

/// Request posted by the host (dApp or mobile app) into the auth surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    /// Client-generated correlation id
    pub id: String,
    pub content: Value,
}

impl IncomingRequest {
    /// Shape filter used on raw window messages: an object with a string
    /// `id` and a `content` field. Anything else is not a request.
    pub fn from_message(data: &Value) -> Option<Self> {
        let object = data.as_object()?;
        let id = object.get("id")?.as_str()?;
        let content = object.get("content")?;

        Some(Self {
            id: id.to_string(),
            content: content.clone(),
        })
    }
}

/// Structured error carried back to the host instead of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub message: String,
    pub code: i64,
}

impl RpcError {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn user_cancelled() -> Self {
        Self::new(USER_CANCELLED_MESSAGE, USER_CANCELLED_CODE)
    }

    /// Answer for a request displaced by a newer one before the user acted.
    pub fn superseded() -> Self {
        Self::new("Request superseded.", REQUEST_SUPERSEDED_CODE)
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(format!("Unsupported method: {}.", method), UNSUPPORTED_METHOD_CODE)
    }
}

/// Body of a response: either `{result}` or `{result: null, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContent<T = Value> {
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl<T> ResponseContent<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Response sent back across the bridge, correlated by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingResponse<T = Value> {
    /// Fresh id of this response message
    pub id: String,
    /// Echo of the originating request id
    pub request_id: String,
    pub content: ResponseContent<T>,
}

impl<T> OutgoingResponse<T> {
    pub fn resolve(request_id: impl Into<String>, result: T) -> Self {
        Self {
            id: new_correlation_id(),
            request_id: request_id.into(),
            content: ResponseContent {
                result: Some(result),
                error: None,
            },
        }
    }

    pub fn reject(request_id: impl Into<String>, error: RpcError) -> Self {
        Self {
            id: new_correlation_id(),
            request_id: request_id.into(),
            content: ResponseContent {
                result: None,
                error: Some(error),
            },
        }
    }
}

/// Token handed to the host together with its expiry (unix seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub value: String,
    pub expires_at: i64,
}

/// Non-envelope messages posted to an opener or parent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "access.token")]
    AccessToken { payload: TokenPayload },
    #[serde(rename = "refresh.token")]
    RefreshToken { payload: TokenPayload },
    #[serde(rename = "logout")]
    Logout,
    /// Native-style `{action, payload}` envelope, JSON-encoded, for iframe hosts
    #[serde(rename = "embedded")]
    Embedded { payload: String },
}

pub const POPUP_UNLOAD_EVENT: &str = "PopupUnload";

/// Sentinel posted to the opener in place of closing the popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupUnload {
    pub event: String,
}

impl Default for PopupUnload {
    fn default() -> Self {
        Self {
            event: POPUP_UNLOAD_EVENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape_filter() {
        let request = IncomingRequest::from_message(&json!({"id": "r1", "content": {"a": 1}}));
        assert_eq!(request.map(|r| r.id), Some("r1".to_string()));

        assert!(IncomingRequest::from_message(&json!({"id": 7, "content": {}})).is_none());
        assert!(IncomingRequest::from_message(&json!({"id": "r1"})).is_none());
        assert!(IncomingRequest::from_message(&json!("r1")).is_none());
    }

    #[test]
    fn test_rejection_wire_shape() {
        let response: OutgoingResponse = OutgoingResponse::reject("r1", RpcError::user_cancelled());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["requestId"], "r1");
        assert_eq!(value["content"]["result"], Value::Null);
        assert_eq!(value["content"]["error"]["code"], -32002);
        assert_eq!(value["content"]["error"]["message"], "User cancelled.");
        assert_ne!(value["id"], value["requestId"]);
    }

    #[test]
    fn test_superseded_is_not_a_user_rejection() {
        let error = RpcError::superseded();
        assert_eq!(error.code, -32003);
        assert_ne!(error.code, RpcError::user_cancelled().code);
    }

    #[test]
    fn test_resolution_has_no_error_field() {
        let response = OutgoingResponse::resolve("r1", json!("0xabc"));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["content"], json!({"result": "0xabc"}));
        assert!(!response.content.is_error());
    }

    #[test]
    fn test_host_message_tags() {
        let access = HostMessage::AccessToken {
            payload: TokenPayload { value: "jwt".into(), expires_at: 42 },
        };
        assert_eq!(
            serde_json::to_value(&access).unwrap(),
            json!({"type": "access.token", "payload": {"value": "jwt", "expiresAt": 42}})
        );
        assert_eq!(serde_json::to_value(&HostMessage::Logout).unwrap(), json!({"type": "logout"}));
        assert_eq!(
            serde_json::to_value(PopupUnload::default()).unwrap(),
            json!({"event": "PopupUnload"})
        );
    }
}
