use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{HostMessage, IncomingRequest, NativeAction, OutgoingResponse, TokenPayload};
use serde_json::Value;

use super::environment::EnvironmentProbe;
use super::event_bus::Subscription;
use super::native::NativeBridge;
use super::{CommunicationService, RequestListener, TransportKind};
use crate::error::BridgeError;

/// Transport for a surface framed by a partner page. An iframe cannot close
/// itself, so `close` asks the parent to do it.
pub struct EmbeddedService {
    native: NativeBridge,
    has_parent: bool,
    announced: Arc<AtomicBool>,
}

impl EmbeddedService {
    pub fn new(probe: &dyn EnvironmentProbe, native: NativeBridge) -> Self {
        Self {
            native,
            has_parent: probe.has_parent(),
            announced: Arc::new(AtomicBool::new(false)),
        }
    }

    fn send_host_message(&self, message: &HostMessage) -> Result<(), BridgeError> {
        self.native.send(NativeAction::Rpc, serde_json::to_value(message)?)
    }
}

impl CommunicationService for EmbeddedService {
    fn name(&self) -> TransportKind {
        TransportKind::Embedded
    }

    fn is_managed(&self) -> bool {
        self.has_parent
    }

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError> {
        self.native.send(NativeAction::Rpc, serde_json::to_value(response)?)
    }

    fn emit_access_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.send_host_message(&HostMessage::AccessToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        })
    }

    fn emit_refresh_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.send_host_message(&HostMessage::RefreshToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        })
    }

    fn logout(&self) -> Result<(), BridgeError> {
        self.native.send(NativeAction::Logout, Value::Null)
    }

    fn close(&self) -> Result<(), BridgeError> {
        self.native.send(NativeAction::CloseModal, Value::Null)
    }

    fn reload(&self) {
        self.native.reload();
    }

    fn is_mobile(&self) -> bool {
        false
    }

    fn listen(&self, callback: RequestListener) -> Subscription {
        let rpc = self.native.register_handler(NativeAction::Rpc, move |payload| {
            match IncomingRequest::from_message(payload) {
                Some(request) => callback(request),
                None => tracing::warn!("Dropping rpc payload that is not a request envelope"),
            }
        });
        let echo = self.native.install_echo();

        if !self.announced.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.native.send(NativeAction::Connected, Value::Null) {
                tracing::warn!("Failed to announce embedded surface: {}", e);
            }
        }

        Subscription::combine([rpc, echo])
    }
}
