// common/src/native.rs
//! `{action, payload}` envelopes exchanged with a React Native host.
//!
//! Web to native: `postMessage(JSON.stringify(envelope))`.
//! Native to web: the host evaluates `window.onMessageFromRN("<json>");`.
//! The second direction is encoded twice: the envelope JSON becomes a
//! JavaScript string literal, which is itself JSON, so it survives being
//! parsed as script source before the callback parses it again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CommonError;

/// Global callback the native host invokes through injected script.
pub const NATIVE_CALLBACK: &str = "window.onMessageFromRN";

/// Known action names on either side of the WebView boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NativeAction {
    Echo,
    Connected,
    CloseModal,
    Logout,
    Rpc,
    OpenModal,
}

impl NativeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeAction::Echo => "echo",
            NativeAction::Connected => "connected",
            NativeAction::CloseModal => "closeModal",
            NativeAction::Logout => "logout",
            NativeAction::Rpc => "rpc",
            NativeAction::OpenModal => "openModal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "echo" => Some(NativeAction::Echo),
            "connected" => Some(NativeAction::Connected),
            "closeModal" => Some(NativeAction::CloseModal),
            "logout" => Some(NativeAction::Logout),
            "rpc" => Some(NativeAction::Rpc),
            "openModal" => Some(NativeAction::OpenModal),
            _ => None,
        }
    }
}

/// Wire envelope. `action` stays a string so unknown actions decode and can
/// be dropped by the receiver instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEnvelope {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

impl NativeEnvelope {
    pub fn new(action: NativeAction, payload: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            payload,
        }
    }

    pub fn known_action(&self) -> Option<NativeAction> {
        NativeAction::from_name(&self.action)
    }

    pub fn encode(&self) -> Result<String, CommonError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, CommonError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Script source the native side hands to `injectJavaScript`.
    pub fn to_injected_script(&self) -> Result<String, CommonError> {
        let json = self.encode()?;
        let literal = serde_json::to_string(&json)?;
        Ok(format!("{}({});", NATIVE_CALLBACK, literal))
    }

    /// Inverse of [`NativeEnvelope::to_injected_script`], used to simulate
    /// the web side evaluating the injected call.
    pub fn from_injected_script(script: &str) -> Result<Self, CommonError> {
        let literal = script
            .trim()
            .strip_prefix(NATIVE_CALLBACK)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(';'))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| CommonError::InvalidScript(script.to_string()))?;

        let json: String = serde_json::from_str(literal)?;
        Self::decode(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_echo_round_trip_through_injected_script() {
        let envelope = NativeEnvelope::new(NativeAction::Echo, json!({"message": "hi"}));

        let script = envelope.to_injected_script().unwrap();
        assert!(script.starts_with("window.onMessageFromRN(\""));
        assert!(script.contains(r#"\"action\":\"echo\""#));

        let decoded = NativeEnvelope::from_injected_script(&script).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.payload, json!({"message": "hi"}));
    }

    #[test]
    fn test_payload_with_quotes_survives_double_encoding() {
        let envelope = NativeEnvelope::new(
            NativeAction::Rpc,
            json!({"text": "she said \"gm\"\n", "nested": ["a\\b"]}),
        );
        let script = envelope.to_injected_script().unwrap();
        assert_eq!(NativeEnvelope::from_injected_script(&script).unwrap(), envelope);
    }

    #[test]
    fn test_unknown_action_still_decodes() {
        let envelope = NativeEnvelope::decode(r#"{"action":"teleport"}"#).unwrap();
        assert_eq!(envelope.known_action(), None);
        assert_eq!(envelope.payload, Value::Null);
    }

    #[test]
    fn test_rejects_foreign_script() {
        assert!(NativeEnvelope::from_injected_script("alert(1);").is_err());
        assert!(NativeEnvelope::decode("not json").is_err());
    }

    #[test]
    fn test_action_names() {
        for action in [
            NativeAction::Echo,
            NativeAction::Connected,
            NativeAction::CloseModal,
            NativeAction::Logout,
            NativeAction::Rpc,
            NativeAction::OpenModal,
        ] {
            assert_eq!(NativeAction::from_name(action.as_str()), Some(action));
            assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
        }
    }
}
