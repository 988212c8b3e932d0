use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{HostMessage, IncomingRequest, NativeAction, OutgoingResponse, TokenPayload};
use serde_json::{json, Value};

use super::environment::EnvironmentProbe;
use super::event_bus::Subscription;
use super::native::NativeBridge;
use super::{CommunicationService, RequestListener, TransportKind};
use crate::error::BridgeError;

/// Side channel for WebView diagnostics, whose console output developers
/// normally never see.
pub trait RemoteLog: Send + Sync {
    fn log(&self, operation: &str, detail: &Value);
}

/// Writes remote log lines through `tracing` under the `webview.remote` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRemoteLog;

impl RemoteLog for TracingRemoteLog {
    fn log(&self, operation: &str, detail: &Value) {
        tracing::info!(target: "webview.remote", operation, %detail);
    }
}

/// Transport for a surface running inside a React Native WebView.
pub struct WebViewService {
    native: NativeBridge,
    has_native_bridge: bool,
    remote_log: Arc<dyn RemoteLog>,
    announced: Arc<AtomicBool>,
}

impl WebViewService {
    pub fn new(
        probe: &dyn EnvironmentProbe,
        native: NativeBridge,
        remote_log: Arc<dyn RemoteLog>,
    ) -> Self {
        Self {
            native,
            has_native_bridge: probe.has_native_bridge(),
            remote_log,
            announced: Arc::new(AtomicBool::new(false)),
        }
    }

    fn send_logged(&self, operation: &str, action: NativeAction, payload: Value) -> Result<(), BridgeError> {
        self.remote_log.log(operation, &payload);
        let result = self.native.send(action, payload);
        if let Err(e) = &result {
            self.remote_log.log("error", &json!({ "operation": operation, "error": e.to_string() }));
        }
        result
    }
}

impl CommunicationService for WebViewService {
    fn name(&self) -> TransportKind {
        TransportKind::WebView
    }

    fn is_managed(&self) -> bool {
        self.has_native_bridge
    }

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError> {
        self.send_logged("sendMessage", NativeAction::Rpc, serde_json::to_value(response)?)
    }

    fn emit_access_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        let message = HostMessage::AccessToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        };
        self.send_logged("emitAccessToken", NativeAction::Rpc, serde_json::to_value(message)?)
    }

    fn emit_refresh_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        let message = HostMessage::RefreshToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        };
        self.send_logged("emitRefreshToken", NativeAction::Rpc, serde_json::to_value(message)?)
    }

    fn logout(&self) -> Result<(), BridgeError> {
        self.send_logged("logout", NativeAction::Logout, Value::Null)
    }

    fn close(&self) -> Result<(), BridgeError> {
        self.send_logged("close", NativeAction::CloseModal, Value::Null)
    }

    fn reload(&self) {
        self.remote_log.log("reload", &Value::Null);
        self.native.reload();
    }

    fn is_mobile(&self) -> bool {
        true
    }

    fn listen(&self, callback: RequestListener) -> Subscription {
        let remote_log = Arc::clone(&self.remote_log);
        let rpc = self.native.register_handler(NativeAction::Rpc, move |payload| {
            remote_log.log("receive", payload);
            match IncomingRequest::from_message(payload) {
                Some(request) => callback(request),
                None => tracing::warn!("Dropping rpc payload that is not a request envelope"),
            }
        });
        let echo = self.native.install_echo();

        if !self.announced.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.send_logged("connected", NativeAction::Connected, Value::Null) {
                tracing::warn!("Failed to announce WebView surface: {}", e);
            }
        }

        Subscription::combine([rpc, echo])
    }
}
