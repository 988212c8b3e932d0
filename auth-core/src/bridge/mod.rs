//! Cross-context message bridge.
//!
//! Every transport implements [`CommunicationService`]. Upstream code only
//! ever talks to [`DelegatingService`], which binds one transport at
//! construction and never rebinds it.

mod embedded;
mod environment;
mod event_bus;
mod facade;
mod host;
mod native;
mod noop;
mod popup;
mod webview;

use std::fmt;
use std::sync::Arc;

use common::{IncomingRequest, OutgoingResponse};

use crate::error::BridgeError;

pub use embedded::EmbeddedService;
pub use environment::{EnvironmentProbe, HostKind, StaticEnvironment};
pub use event_bus::{EventBus, HostEvents, Subscription, WindowMessage, WINDOW_MESSAGE};
pub use facade::DelegatingService;
pub use host::HostWindow;
pub use native::{NativeBridge, NativeChannel};
pub use noop::NoopService;
pub use popup::{OriginPolicy, PopupService};
pub use webview::{RemoteLog, TracingRemoteLog, WebViewService};

/// Callback invoked for every inbound request envelope.
pub type RequestListener = Arc<dyn Fn(IncomingRequest) + Send + Sync>;

/// Name of a concrete transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Popup,
    WebView,
    Embedded,
    Noop,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Popup => "popup",
            TransportKind::WebView => "webview",
            TransportKind::Embedded => "embedded",
            TransportKind::Noop => "noop",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform contract over popup, iframe and WebView hosts.
///
/// Calls on a transport that is not managed must not fail; callers are not
/// expected to check [`CommunicationService::is_managed`] first.
pub trait CommunicationService: Send + Sync {
    fn name(&self) -> TransportKind;

    /// Whether this transport is the active one for the current runtime.
    fn is_managed(&self) -> bool;

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError>;

    fn emit_access_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError>;

    fn emit_refresh_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError>;

    fn logout(&self) -> Result<(), BridgeError>;

    fn close(&self) -> Result<(), BridgeError>;

    fn reload(&self);

    fn is_mobile(&self) -> bool;

    /// Register an inbound request handler. The returned handle is always
    /// safe to cancel, even more than once.
    fn listen(&self, callback: RequestListener) -> Subscription;
}
