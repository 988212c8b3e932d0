//! Glue between the bridge and the machine: classify inbound envelopes,
//! queue them, and hand tokens back to the host.

use std::sync::{Arc, Mutex};

use common::{IncomingRequest, NativeAction, OutgoingResponse, RpcError, SessionTokens};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bridge::{CommunicationService, DelegatingService, Subscription};
use crate::error::BridgeError;
use crate::machine::{MachineEvent, PendingRequests, RequestMachine, Snapshot, State};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("request envelope has no action")]
    Malformed,

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCategory {
    Authentication,
    Signing,
    Transaction,
}

impl RequestCategory {
    pub fn for_method(method: &str) -> Option<Self> {
        match method {
            "eth_requestAccounts" | "eth_accounts" | "wallet_requestPermissions" | "connect" => {
                Some(RequestCategory::Authentication)
            }
            "personal_sign" | "eth_sign" | "eth_signTypedData" | "eth_signTypedData_v4" => {
                Some(RequestCategory::Signing)
            }
            "eth_sendTransaction" | "wallet_sendCalls" => Some(RequestCategory::Transaction),
            _ => None,
        }
    }
}

/// Turn a raw envelope into the pending-request set for `PUSH_REQUEST`.
/// The categorized item is the envelope's `action` object.
pub fn classify(request: IncomingRequest) -> Result<PendingRequests, ClassifyError> {
    let action = request
        .content
        .get("action")
        .filter(|action| action.is_object())
        .cloned()
        .ok_or(ClassifyError::Malformed)?;

    let method = action
        .get("method")
        .and_then(Value::as_str)
        .ok_or(ClassifyError::Malformed)?;

    let category = RequestCategory::for_method(method)
        .ok_or_else(|| ClassifyError::UnsupportedMethod(method.to_string()))?;

    let session = request.content.get("session").filter(|s| !s.is_null()).cloned();

    let mut requests = PendingRequests {
        session,
        ..PendingRequests::default()
    };
    match category {
        RequestCategory::Authentication => requests.authentication = Some(action),
        RequestCategory::Signing => requests.signing = Some(action),
        RequestCategory::Transaction => requests.transaction = Some(action),
    }
    requests.incoming = Some(request);

    Ok(requests)
}

/// What the transport callbacks queue for the next pump.
enum Inbound {
    Request(IncomingRequest),
    OpenModal,
}

/// One surface session: the bound transport plus the machine it drives.
///
/// Inbound envelopes are queued by the transport callback and only reach the
/// machine through [`AuthSession::pump`], so the machine is never re-entered
/// from inside a transport.
pub struct AuthSession {
    bridge: Arc<DelegatingService>,
    machine: Mutex<RequestMachine>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    subscription: Mutex<Subscription>,
}

impl AuthSession {
    pub fn new(bridge: DelegatingService) -> Self {
        let bridge = Arc::new(bridge);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let machine = RequestMachine::new(Arc::clone(&bridge) as Arc<dyn CommunicationService>);

        Self {
            bridge,
            machine: Mutex::new(machine),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            subscription: Mutex::new(Subscription::noop()),
        }
    }

    pub fn bridge(&self) -> &Arc<DelegatingService> {
        &self.bridge
    }

    /// Start listening on the bound transport. Calling it again replaces the
    /// previous subscription.
    pub fn attach(&self) {
        let tx = self.inbox_tx.clone();
        let requests = self.bridge.listen(Arc::new(move |request: IncomingRequest| {
            if tx.send(Inbound::Request(request)).is_err() {
                tracing::warn!("Session inbox closed; dropping inbound request");
            }
        }));

        // The host's "open modal" clears any stale error shown from a previous flow
        let modal_tx = self.inbox_tx.clone();
        let open_modal = self.bridge.events().register_native_handler(
            NativeAction::OpenModal,
            move |_| {
                let _ = modal_tx.send(Inbound::OpenModal);
            },
        );

        let mut subscription = lock(&self.subscription);
        subscription.unsubscribe();
        *subscription = Subscription::combine([requests, open_modal]);
        tracing::info!("Session attached to {} transport", self.bridge.name());
    }

    pub fn detach(&self) {
        lock(&self.subscription).unsubscribe();
    }

    /// Drain queued envelopes into the machine. Returns how many were taken.
    pub fn pump(&self) -> usize {
        let mut taken = 0;
        loop {
            let inbound = match lock(&self.inbox_rx).try_recv() {
                Ok(inbound) => inbound,
                Err(_) => return taken,
            };
            taken += 1;

            match inbound {
                Inbound::Request(request) => self.handle_request(request),
                Inbound::OpenModal => {
                    self.dispatch(MachineEvent::ClearError);
                }
            }
        }
    }

    fn handle_request(&self, request: IncomingRequest) {
        let request_id = request.id.clone();
        match classify(request) {
            Ok(requests) => {
                tracing::debug!("Queued request {} for approval", request_id);
                self.dispatch(MachineEvent::PushRequest { requests });
            }
            Err(ClassifyError::UnsupportedMethod(method)) => {
                tracing::warn!("Rejecting request {}: unsupported method {}", request_id, method);
                let response = OutgoingResponse::reject(&request_id, RpcError::unsupported_method(&method));
                if let Err(e) = self.bridge.send_message(&response) {
                    tracing::warn!("Failed to reject request {}: {}", request_id, e);
                }
            }
            Err(ClassifyError::Malformed) => {
                tracing::warn!("Dropping malformed request {}", request_id);
            }
        }
    }

    pub fn dispatch(&self, event: MachineEvent) -> State {
        lock(&self.machine).send(event)
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.machine).snapshot()
    }

    pub fn emit_session_tokens(&self, tokens: &SessionTokens) -> Result<(), BridgeError> {
        self.bridge
            .emit_access_token(&tokens.access.value, tokens.access.expires_at)?;
        self.bridge
            .emit_refresh_token(&tokens.refresh.value, tokens.refresh.expires_at)
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.detach();
    }
}

// A poisoned lock only means a handler panicked mid-dispatch; the state is
// still the last fully applied one.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
