//! Core of the smart-account auth surface.
//!
//! [`bridge`] moves request/response envelopes between the surface and
//! whatever hosts it (popup opener, iframe parent, React Native WebView).
//! [`machine`] decides which screen the user is on given two independent
//! inputs: pending requests and authentication status. [`hooks`] glues the
//! two together.

pub mod bridge;
pub mod error;
pub mod hooks;
pub mod machine;

pub use bridge::{
    CommunicationService, DelegatingService, EnvironmentProbe, EventBus, HostEvents, HostKind,
    HostWindow, RemoteLog, StaticEnvironment, Subscription, TransportKind, WindowMessage,
};
pub use error::BridgeError;
pub use hooks::{classify, AuthSession, ClassifyError, RequestCategory};
pub use machine::{
    ContextGuards, Guards, LoginStep, MachineEvent, PendingRequests, RequestMachine,
    SessionContext, Snapshot, State,
};
