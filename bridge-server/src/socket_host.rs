// bridge-server/src/socket_host.rs
use auth_core::{BridgeError, HostWindow};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Host window backed by the host's WebSocket. Every post becomes one text
/// frame, queued until the session actor forwards it.
pub struct SocketHost {
    outbox: mpsc::UnboundedSender<String>,
}

impl SocketHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbox, frames) = mpsc::unbounded_channel();
        (Self { outbox }, frames)
    }

    fn push(&self, frame: String) -> Result<(), BridgeError> {
        self.outbox
            .send(frame)
            .map_err(|_| BridgeError::HostUnavailable("host socket closed".to_string()))
    }
}

impl HostWindow for SocketHost {
    // Target origin is enforced by the browser-side shim, not the socket
    fn post_to_opener(&self, message: Value, _target_origin: &str) -> Result<(), BridgeError> {
        self.push(message.to_string())
    }

    fn post_to_parent(&self, message: Value, _target_origin: &str) -> Result<(), BridgeError> {
        self.push(message.to_string())
    }

    fn post_to_native(&self, data: String) -> Result<(), BridgeError> {
        self.push(data)
    }

    fn reload(&self) {
        if self.push(json!({ "type": "reload" }).to_string()).is_err() {
            tracing::warn!("Reload requested after host socket closed");
        }
    }
}
