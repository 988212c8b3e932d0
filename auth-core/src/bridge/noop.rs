use common::OutgoingResponse;

use super::event_bus::Subscription;
use super::{CommunicationService, RequestListener, TransportKind};
use crate::error::BridgeError;

/// Fallback when nothing hosts the surface (server rendering, a plain tab).
/// Every call succeeds and does nothing beyond a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopService;

impl CommunicationService for NoopService {
    fn name(&self) -> TransportKind {
        TransportKind::Noop
    }

    fn is_managed(&self) -> bool {
        false
    }

    fn send_message(&self, response: &OutgoingResponse) -> Result<(), BridgeError> {
        tracing::warn!("No host to deliver response for request {}", response.request_id);
        Ok(())
    }

    fn emit_access_token(&self, _value: &str, _expires_at: i64) -> Result<(), BridgeError> {
        tracing::warn!("No host to receive access token");
        Ok(())
    }

    fn emit_refresh_token(&self, _value: &str, _expires_at: i64) -> Result<(), BridgeError> {
        tracing::warn!("No host to receive refresh token");
        Ok(())
    }

    fn logout(&self) -> Result<(), BridgeError> {
        tracing::warn!("No host to notify of logout");
        Ok(())
    }

    fn close(&self) -> Result<(), BridgeError> {
        tracing::warn!("No host to close");
        Ok(())
    }

    fn reload(&self) {
        tracing::warn!("No host to reload");
    }

    fn is_mobile(&self) -> bool {
        false
    }

    fn listen(&self, _callback: RequestListener) -> Subscription {
        Subscription::noop()
    }
}
