//! Request orchestration state machine.
//!
//! Two inputs arrive independently: pending requests (`PUSH_REQUEST`) and
//! authentication status (`RESOURCES_LOADED`). After every event the machine
//! runs its eventless transitions until none applies, so the resting state
//! depends only on what has arrived, never on the order it arrived in.

mod context;
mod event;
mod guards;
mod state;

use std::collections::VecDeque;
use std::sync::Arc;

use common::{OutgoingResponse, RpcError};
use serde::Serialize;
use serde_json::Value;

use crate::bridge::CommunicationService;

pub use context::{PendingRequests, SessionContext};
pub use event::MachineEvent;
pub use guards::{ContextGuards, Guards};
pub use state::{LoginStep, State};

/// How many answered request ids are remembered to refuse re-delivery.
const ANSWERED_HISTORY: usize = 64;
/// Upper bound on eventless hops per event.
const MAX_SETTLE_STEPS: usize = 16;

/// Current state plus context.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: State,
    pub context: SessionContext,
}

pub struct RequestMachine<G = ContextGuards> {
    state: State,
    context: SessionContext,
    guards: G,
    bridge: Arc<dyn CommunicationService>,
    answered: VecDeque<String>,
    trail: Vec<State>,
}

impl RequestMachine<ContextGuards> {
    pub fn new(bridge: Arc<dyn CommunicationService>) -> Self {
        Self::with_guards(bridge, ContextGuards)
    }
}

impl<G: Guards> RequestMachine<G> {
    pub fn with_guards(bridge: Arc<dyn CommunicationService>, guards: G) -> Self {
        Self {
            state: State::Loading,
            context: SessionContext::default(),
            guards,
            bridge,
            answered: VecDeque::with_capacity(ANSWERED_HISTORY),
            trail: vec![State::Loading],
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            context: self.context.clone(),
        }
    }

    /// States passed through while handling the last event, starting with
    /// the state the event found the machine in.
    pub fn trail(&self) -> &[State] {
        &self.trail
    }

    pub fn has_answered(&self, request_id: &str) -> bool {
        self.answered.iter().any(|id| id == request_id)
    }

    /// Feed one event and settle. Events with no transition in the current
    /// state are ignored.
    pub fn send(&mut self, event: MachineEvent) -> State {
        self.trail.clear();
        self.trail.push(self.state);

        let name = event.name();
        if !self.apply(event) {
            tracing::debug!("{} ignored in {}", name, self.state);
        }

        self.settle();
        self.state
    }

    fn apply(&mut self, event: MachineEvent) -> bool {
        match event {
            MachineEvent::PushRequest { requests } => self.push_requests(requests),
            MachineEvent::ResourcesLoaded { authenticated } => {
                self.context.is_loading_resources = false;
                self.context.is_authenticated = authenticated;
                true
            }
            MachineEvent::SetError { error } => {
                self.context.error = Some(error);
                self.back_to_login();
                true
            }
            MachineEvent::ClearError => {
                self.context.error = None;
                true
            }
            MachineEvent::Cancel => {
                self.clear_requests();
                self.enter(State::Completed);
                true
            }
            MachineEvent::Accept { result } => {
                if !self.state.is_awaiting_approval() {
                    return false;
                }
                self.resolve_requests(result);
                self.enter(State::Completed);
                true
            }
            MachineEvent::AuthenticationStarted => self.login_step(LoginStep::Idle, LoginStep::Started),
            MachineEvent::WalletSelection => self.login_step(LoginStep::Idle, LoginStep::SelectEoaWallet),
            MachineEvent::WalletSelected => self.login_step(LoginStep::SelectEoaWallet, LoginStep::Started),
            MachineEvent::OtpSent => self.login_step(LoginStep::Idle, LoginStep::WaitForEmailOtp),
            MachineEvent::OtpVerified => self.login_step(LoginStep::WaitForEmailOtp, LoginStep::Started),
            MachineEvent::AccountAuthenticated => self.login_step(LoginStep::Started, LoginStep::Deployment),
            MachineEvent::AccountError { error } => {
                if error.is_some() {
                    self.context.error = error;
                }
                self.back_to_login()
            }
            MachineEvent::LoginSuccess => {
                let done = self.login_step(LoginStep::Deployment, LoginStep::Complete);
                if done {
                    self.context.is_authenticated = true;
                }
                done
            }
            MachineEvent::SwitchNetwork => {
                if self.state != State::WrongNetwork {
                    return false;
                }
                self.enter(State::Loading);
                true
            }
            MachineEvent::Logout => {
                if self.state != State::Profile {
                    return false;
                }
                if let Err(e) = self.bridge.logout() {
                    tracing::warn!("Failed to notify host of logout: {}", e);
                }
                self.context.is_authenticated = false;
                self.enter(State::LoginRequired(LoginStep::Idle));
                true
            }
        }
    }

    fn login_step(&mut self, from: LoginStep, to: LoginStep) -> bool {
        if self.state != State::LoginRequired(from) {
            return false;
        }
        self.enter(State::LoginRequired(to));
        true
    }

    /// Upstream failures send an in-progress login back to a retryable step.
    fn back_to_login(&mut self) -> bool {
        match self.state {
            State::LoginRequired(LoginStep::Idle) | State::LoginRequired(LoginStep::Complete) => false,
            State::LoginRequired(_) => {
                self.enter(State::LoginRequired(LoginStep::Idle));
                true
            }
            _ => false,
        }
    }

    fn push_requests(&mut self, requests: PendingRequests) -> bool {
        if !requests.is_consistent() {
            tracing::warn!("Ignoring PUSH_REQUEST with classified items but no incoming envelope");
            return false;
        }

        if let Some(id) = requests.incoming_id() {
            if self.has_answered(id) {
                tracing::warn!("Ignoring re-delivered request {} that was already answered", id);
                return false;
            }
        }

        let displaced = match self.context.requests.incoming_id() {
            Some(current) if requests.incoming_id() != Some(current) => Some(current.to_string()),
            _ => None,
        };
        if let Some(request_id) = displaced {
            tracing::info!("Request {} superseded before the user acted", request_id);
            self.respond(&request_id, Err(RpcError::superseded()));
        }

        self.context.requests = requests;

        if self.state.is_awaiting_approval() {
            self.enter(State::IncomingRequest);
        }
        true
    }

    /// CANCEL: answer the pending request as user-cancelled, then forget it.
    fn clear_requests(&mut self) {
        if let Some(request_id) = self.context.requests.incoming_id().map(str::to_string) {
            self.respond(&request_id, Err(RpcError::user_cancelled()));
        }
        self.context.requests = PendingRequests::default();
    }

    /// ACCEPT: deliver the result when one was supplied, then forget it.
    /// Without a result the caller already answered through the bridge.
    fn resolve_requests(&mut self, result: Option<Value>) {
        if let Some(request_id) = self.context.requests.incoming_id().map(str::to_string) {
            match result {
                Some(result) => self.respond(&request_id, Ok(result)),
                None => self.remember(&request_id),
            }
        }
        self.context.requests = PendingRequests::default();
    }

    fn respond(&mut self, request_id: &str, outcome: Result<Value, RpcError>) {
        if self.has_answered(request_id) {
            tracing::debug!("Request {} already answered", request_id);
            return;
        }

        let response = match outcome {
            Ok(result) => OutgoingResponse::resolve(request_id, result),
            Err(error) => OutgoingResponse::reject(request_id, error),
        };

        // Delivery is best effort; the transition completes either way
        if let Err(e) = self.bridge.send_message(&response) {
            tracing::warn!("Failed to deliver response for request {}: {}", request_id, e);
        } else {
            tracing::info!("Answered request {} via {}", request_id, self.bridge.name());
        }

        self.remember(request_id);
    }

    fn remember(&mut self, request_id: &str) {
        if self.has_answered(request_id) {
            return;
        }
        if self.answered.len() == ANSWERED_HISTORY {
            self.answered.pop_front();
        }
        self.answered.push_back(request_id.to_string());
    }

    fn finish_flow(&mut self) {
        if let Err(e) = self.bridge.close() {
            tracing::warn!("Failed to close host transport: {}", e);
        }
    }

    fn enter(&mut self, next: State) {
        tracing::debug!("{} -> {}", self.state, next);
        self.state = next;
        self.trail.push(next);
    }

    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_STEPS {
            let Some(next) = self.eventless() else {
                return;
            };
            if self.state == State::Completed {
                self.finish_flow();
            }
            self.enter(next);
        }
        tracing::error!("Eventless transitions did not settle; resting in {}", self.state);
    }

    fn eventless(&self) -> Option<State> {
        let context = &self.context;
        let requests = &context.requests;
        let guards = &self.guards;

        match self.state {
            State::Loading => {
                if context.is_loading_resources {
                    None
                } else if guards.is_authenticated(context) && !guards.is_supported_network(context) {
                    Some(State::WrongNetwork)
                } else if requests.incoming.is_some() && guards.is_authenticated(context) {
                    Some(State::IncomingRequest)
                } else if guards.is_not_authenticated(context) {
                    Some(State::LoginRequired(LoginStep::Idle))
                } else if guards.is_authenticated(context) {
                    Some(State::Profile)
                } else {
                    None
                }
            }
            // onDone of the login composite
            State::LoginRequired(LoginStep::Complete) => {
                if requests.incoming.is_some() {
                    Some(State::IncomingRequest)
                } else {
                    Some(State::Profile)
                }
            }
            State::IncomingRequest => {
                if guards.is_not_authenticated(context) {
                    Some(State::LoginRequired(LoginStep::Idle))
                } else if requests.signing.is_some() {
                    Some(State::IncomingSignature)
                } else if requests.transaction.is_some() {
                    Some(State::IncomingTransaction)
                } else if requests.incoming.is_some() {
                    Some(State::IncomingAuthentication)
                } else {
                    Some(State::Profile)
                }
            }
            State::Profile => {
                if requests.incoming.is_some() {
                    Some(State::IncomingRequest)
                } else if guards.is_not_authenticated(context) {
                    Some(State::LoginRequired(LoginStep::Idle))
                } else {
                    None
                }
            }
            State::Completed => Some(State::Loading),
            _ => None,
        }
    }
}
