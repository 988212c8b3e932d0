use std::sync::Arc;

use common::{HostMessage, IncomingRequest, OutgoingResponse, PopupUnload, TokenPayload};
use serde::Serialize;
use url::Url;

use super::environment::EnvironmentProbe;
use super::event_bus::{HostEvents, Subscription, WINDOW_MESSAGE};
use super::host::HostWindow;
use super::{CommunicationService, RequestListener, TransportKind};
use crate::error::BridgeError;

/// Which origins may post requests into the popup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    restricted: bool,
}

impl OriginPolicy {
    /// An empty list accepts every origin. Entries that do not parse as URLs
    /// are dropped with a warning; they never widen the policy.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut restricted = false;
        let allowed = origins
            .into_iter()
            .inspect(|_| restricted = true)
            .filter_map(|origin| {
                let origin = origin.as_ref();
                let normalized = normalize_origin(origin);
                if normalized.is_none() {
                    tracing::warn!("Ignoring invalid allowed origin: {}", origin);
                }
                normalized
            })
            .collect();

        Self { allowed, restricted }
    }

    pub fn allows(&self, origin: &str) -> bool {
        if !self.restricted {
            return true;
        }
        match normalize_origin(origin) {
            Some(origin) => self.allowed.contains(&origin),
            None => false,
        }
    }
}

fn normalize_origin(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Transport for a surface opened with `window.open`.
pub struct PopupService {
    host: Arc<dyn HostWindow>,
    events: HostEvents,
    has_opener: bool,
    target_origin: String,
    origins: OriginPolicy,
}

impl PopupService {
    pub fn new(
        probe: &dyn EnvironmentProbe,
        host: Arc<dyn HostWindow>,
        events: HostEvents,
        target_origin: impl Into<String>,
        origins: OriginPolicy,
    ) -> Self {
        Self {
            host,
            events,
            has_opener: probe.has_opener(),
            target_origin: target_origin.into(),
            origins,
        }
    }

    fn post<T: Serialize>(&self, message: &T) -> Result<(), BridgeError> {
        let message = serde_json::to_value(message)?;
        self.host.post_to_opener(message, &self.target_origin)
    }
}

impl CommunicationService for PopupService {
    fn name(&self) -> TransportKind {
        TransportKind::Popup
    }

    fn is_managed(&self) -> bool {
        self.has_opener
    }

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError> {
        self.post(response)
    }

    fn emit_access_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.post(&HostMessage::AccessToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        })
    }

    fn emit_refresh_token(&self, value: &str, expires_at: i64) -> Result<(), BridgeError> {
        self.post(&HostMessage::RefreshToken {
            payload: TokenPayload { value: value.to_string(), expires_at },
        })
    }

    fn logout(&self) -> Result<(), BridgeError> {
        self.post(&HostMessage::Logout)
    }

    // The opener watches for this instead of polling `closed`
    fn close(&self) -> Result<(), BridgeError> {
        self.post(&PopupUnload::default())
    }

    fn reload(&self) {
        self.host.reload();
    }

    fn is_mobile(&self) -> bool {
        false
    }

    fn listen(&self, callback: RequestListener) -> Subscription {
        let origins = self.origins.clone();
        self.events.window().on(WINDOW_MESSAGE, move |message| {
            if !origins.allows(&message.origin) {
                tracing::warn!("Dropping popup message from disallowed origin {}", message.origin);
                return;
            }
            match IncomingRequest::from_message(&message.data) {
                Some(request) => callback(request),
                None => tracing::debug!("Ignoring non-request window message"),
            }
        })
    }
}
