use std::sync::Arc;

use common::{BridgeConfig, OutgoingResponse};

use super::embedded::EmbeddedService;
use super::environment::{EnvironmentProbe, HostKind};
use super::event_bus::{HostEvents, Subscription};
use super::host::HostWindow;
use super::native::{NativeBridge, NativeChannel};
use super::noop::NoopService;
use super::popup::{OriginPolicy, PopupService};
use super::webview::{RemoteLog, TracingRemoteLog, WebViewService};
use super::{CommunicationService, RequestListener, TransportKind};
use crate::error::BridgeError;

/// The one object upstream code talks to. Binds the first managed transport
/// in the order popup, webview, embedded (when enabled), else no-op.
pub struct DelegatingService {
    active: Box<dyn CommunicationService>,
    events: HostEvents,
}

impl DelegatingService {
    pub fn new(probe: &dyn EnvironmentProbe, host: Arc<dyn HostWindow>, config: &BridgeConfig) -> Self {
        Self::with_remote_log(probe, host, config, Arc::new(TracingRemoteLog))
    }

    pub fn with_remote_log(
        probe: &dyn EnvironmentProbe,
        host: Arc<dyn HostWindow>,
        config: &BridgeConfig,
        remote_log: Arc<dyn RemoteLog>,
    ) -> Self {
        let events = HostEvents::new();

        let mut candidates: Vec<Box<dyn CommunicationService>> = vec![
            Box::new(PopupService::new(
                probe,
                Arc::clone(&host),
                events.clone(),
                config.target_origin.clone(),
                OriginPolicy::new(&config.allowed_origins),
            )),
            Box::new(WebViewService::new(
                probe,
                NativeBridge::new(
                    Arc::clone(&host),
                    events.clone(),
                    NativeChannel::ReactNative,
                    config.target_origin.clone(),
                ),
                remote_log,
            )),
        ];

        if config.embedded_enabled {
            candidates.push(Box::new(EmbeddedService::new(
                probe,
                NativeBridge::new(
                    Arc::clone(&host),
                    events.clone(),
                    NativeChannel::ParentFrame,
                    config.target_origin.clone(),
                ),
            )));
        }

        let active = candidates
            .into_iter()
            .find(|candidate| candidate.is_managed())
            .unwrap_or_else(|| Box::new(NoopService));

        tracing::info!("Communication transport bound: {}", active.name());

        Self { active, events }
    }

    /// Inbound side: the host integration feeds window and native traffic here.
    pub fn events(&self) -> &HostEvents {
        &self.events
    }

    pub fn host_kind(&self) -> HostKind {
        match self.active.name() {
            TransportKind::Popup => HostKind::Popup,
            TransportKind::WebView => HostKind::WebView,
            TransportKind::Embedded => HostKind::Embedded,
            TransportKind::Noop => HostKind::Standalone,
        }
    }
}

impl CommunicationService for DelegatingService {
    fn name(&self) -> TransportKind {
        self.active.name()
    }

    fn is_managed(&self) -> bool {
        self.active.is_managed()
    }

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError> {
        self.active.send_message(response)
    }

    fn emit_access_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.active.emit_access_token(value, expires_at)
    }

    fn emit_refresh_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.active.emit_refresh_token(value, expires_at)
    }

    fn logout(&self) -> Result<(), BridgeError> {
        self.active.logout()
    }

    fn close(&self) -> Result<(), BridgeError> {
        self.active.close()
    }

    fn reload(&self) {
        self.active.reload()
    }

    fn is_mobile(&self) -> bool {
        self.active.is_mobile()
    }

    fn listen(&self, callback: RequestListener) -> Subscription {
        self.active.listen(callback)
    }
}
