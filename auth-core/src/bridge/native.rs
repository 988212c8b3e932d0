use std::sync::Arc;

use common::{HostMessage, NativeAction, NativeEnvelope};
use serde_json::Value;

use super::event_bus::{HostEvents, Subscription};
use super::host::HostWindow;
use crate::error::BridgeError;

/// Where native-style envelopes are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeChannel {
    /// `ReactNativeWebView.postMessage(JSON.stringify(envelope))`
    ReactNative,
    /// `parent.postMessage({type: "embedded", payload: JSON.stringify(envelope)})`
    ParentFrame,
}

/// Sends and receives `{action, payload}` envelopes for the iframe and
/// WebView transports.
#[derive(Clone)]
pub struct NativeBridge {
    host: Arc<dyn HostWindow>,
    events: HostEvents,
    channel: NativeChannel,
    target_origin: String,
}

impl NativeBridge {
    pub fn new(
        host: Arc<dyn HostWindow>,
        events: HostEvents,
        channel: NativeChannel,
        target_origin: impl Into<String>,
    ) -> Self {
        Self {
            host,
            events,
            channel,
            target_origin: target_origin.into(),
        }
    }

    pub fn send(&self, action: NativeAction, payload: Value) -> Result<(), BridgeError> {
        let data = NativeEnvelope::new(action, payload).encode()?;

        match self.channel {
            NativeChannel::ReactNative => self.host.post_to_native(data),
            NativeChannel::ParentFrame => {
                let wrapped = serde_json::to_value(HostMessage::Embedded { payload: data })?;
                self.host.post_to_parent(wrapped, &self.target_origin)
            }
        }
    }

    pub fn register_handler<F>(&self, action: NativeAction, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.register_native_handler(action, handler)
    }

    /// Answer native `echo` with the same payload.
    pub fn install_echo(&self) -> Subscription {
        let bridge = self.clone();
        self.register_handler(NativeAction::Echo, move |payload| {
            if let Err(e) = bridge.send(NativeAction::Echo, payload.clone()) {
                tracing::warn!("Failed to answer native echo: {}", e);
            }
        })
    }

    pub fn reload(&self) {
        self.host.reload();
    }
}
