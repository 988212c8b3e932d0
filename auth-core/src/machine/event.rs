use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::PendingRequests;

/// Everything the outside world may tell the machine.
///
/// Serialized with a `type` discriminator, e.g. `{"type": "CANCEL"}` or
/// `{"type": "RESOURCES_LOADED", "authenticated": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineEvent {
    PushRequest {
        requests: PendingRequests,
    },
    ResourcesLoaded {
        authenticated: bool,
    },
    SetError {
        error: String,
    },
    ClearError,
    Cancel,
    /// `result`, when present, is delivered to the host before completing.
    Accept {
        #[serde(default)]
        result: Option<Value>,
    },
    AuthenticationStarted,
    WalletSelection,
    WalletSelected,
    OtpSent,
    OtpVerified,
    AccountAuthenticated,
    AccountError {
        #[serde(default)]
        error: Option<String>,
    },
    LoginSuccess,
    SwitchNetwork,
    Logout,
}

impl MachineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MachineEvent::PushRequest { .. } => "PUSH_REQUEST",
            MachineEvent::ResourcesLoaded { .. } => "RESOURCES_LOADED",
            MachineEvent::SetError { .. } => "SET_ERROR",
            MachineEvent::ClearError => "CLEAR_ERROR",
            MachineEvent::Cancel => "CANCEL",
            MachineEvent::Accept { .. } => "ACCEPT",
            MachineEvent::AuthenticationStarted => "AUTHENTICATION_STARTED",
            MachineEvent::WalletSelection => "WALLET_SELECTION",
            MachineEvent::WalletSelected => "WALLET_SELECTED",
            MachineEvent::OtpSent => "OTP_SENT",
            MachineEvent::OtpVerified => "OTP_VERIFIED",
            MachineEvent::AccountAuthenticated => "ACCOUNT_AUTHENTICATED",
            MachineEvent::AccountError { .. } => "ACCOUNT_ERROR",
            MachineEvent::LoginSuccess => "LOGIN_SUCCESS",
            MachineEvent::SwitchNetwork => "SWITCH_NETWORK",
            MachineEvent::Logout => "LOGOUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names_match_serde_tags() {
        let events = [
            MachineEvent::ClearError,
            MachineEvent::Cancel,
            MachineEvent::OtpSent,
            MachineEvent::OtpVerified,
            MachineEvent::AuthenticationStarted,
            MachineEvent::LoginSuccess,
            MachineEvent::ResourcesLoaded { authenticated: true },
            MachineEvent::Accept { result: None },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }

    #[test]
    fn test_decode_from_surface_json() {
        let event: MachineEvent = serde_json::from_value(json!({"type": "ACCEPT"})).unwrap();
        assert_eq!(event, MachineEvent::Accept { result: None });

        let event: MachineEvent =
            serde_json::from_value(json!({"type": "ACCEPT", "result": "0xsig"})).unwrap();
        assert_eq!(event, MachineEvent::Accept { result: Some(json!("0xsig")) });

        let event: MachineEvent =
            serde_json::from_value(json!({"type": "PUSH_REQUEST", "requests": {}})).unwrap();
        assert_eq!(event, MachineEvent::PushRequest { requests: PendingRequests::default() });

        assert!(serde_json::from_value::<MachineEvent>(json!({"type": "SELF_DESTRUCT"})).is_err());
    }
}
