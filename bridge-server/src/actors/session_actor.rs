// bridge-server/src/actors/session_actor.rs
use std::sync::Arc;

use actix::{Actor, ActorContext, AsyncContext, Context, Handler, Message, MessageResult, Recipient, StreamHandler};
use auth_core::{
    AuthSession, CommunicationService, DelegatingService, HostKind, HostWindow, MachineEvent, Snapshot,
    StaticEnvironment,
};
use common::{
    issue_session_tokens, BridgeConfig, HostMessage, NativeAction, NativeEnvelope, PopupUnload, TokenConfig,
    POPUP_UNLOAD_EVENT,
};
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::socket_host::SocketHost;

/// Frames kept for a host that is momentarily disconnected.
const MAX_BUFFERED_FRAMES: usize = 100;

/// `closeModal` or `PopupUnload`, bare or inside an `embedded` wrapper. These
/// were meant for a host that has gone away and must not reach its successor.
fn is_close_frame(content: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return false;
    };
    if let Ok(unload) = serde_json::from_value::<PopupUnload>(value.clone()) {
        return unload.event == POPUP_UNLOAD_EVENT;
    }

    let native = match serde_json::from_value::<HostMessage>(value) {
        Ok(HostMessage::Embedded { payload }) => payload,
        _ => content.to_string(),
    };
    NativeEnvelope::decode(&native)
        .map(|envelope| envelope.action == NativeAction::CloseModal.as_str())
        .unwrap_or(false)
}

/// Text frame for the host socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct HostFrame {
    pub content: String,
}

/// Text frame for the approval surface socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SurfaceFrame {
    pub content: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct AttachHost {
    pub connection_id: Uuid,
    pub recipient: Recipient<HostFrame>,
}

/// The host socket went away; a pending request is cancelled. Ignored when a
/// newer connection has already replaced it.
#[derive(Message)]
#[rtype(result = "()")]
pub struct DetachHost {
    pub connection_id: Uuid,
}

/// Raw text frame received from the host socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct HostInbound {
    pub text: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct AttachSurface {
    pub recipient: Recipient<SurfaceFrame>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct DetachSurface;

#[derive(Message)]
#[rtype(result = "()")]
pub struct SurfaceEvent {
    pub event: MachineEvent,
}

#[derive(Message)]
#[rtype(result = "Snapshot")]
pub struct GetSnapshot;

#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseSession;

/// Owns one auth session: the bound transport, the machine, and the two
/// sockets that feed it. All events for a session are serialized through
/// this actor's mailbox.
pub struct SessionActor {
    session_id: Uuid,
    kind: HostKind,
    origin: String,
    session: AuthSession,
    frames: Option<tokio::sync::mpsc::UnboundedReceiver<String>>,
    host: Option<(Uuid, Recipient<HostFrame>)>,
    surface: Option<Recipient<SurfaceFrame>>,
    frame_buffer: Vec<String>,
    tokens: TokenConfig,
    tokens_issued: bool,
}

impl SessionActor {
    pub fn new(
        session_id: Uuid,
        kind: HostKind,
        origin: String,
        bridge: &BridgeConfig,
        tokens: TokenConfig,
    ) -> Self {
        let (socket_host, frames) = SocketHost::new();
        let host: Arc<dyn HostWindow> = Arc::new(socket_host);
        let service = DelegatingService::new(&StaticEnvironment::for_kind(kind), host, bridge);

        if service.host_kind() != kind {
            tracing::warn!(
                "Session {} declared host {} but bound {} transport",
                session_id,
                kind,
                service.name()
            );
        }

        let session = AuthSession::new(service);
        session.attach();

        Self {
            session_id,
            kind,
            origin,
            session,
            frames: Some(frames),
            host: None,
            surface: None,
            frame_buffer: Vec::new(),
            tokens,
            tokens_issued: false,
        }
    }

    fn deliver_to_host(&mut self, content: String) {
        match &self.host {
            Some((_, host)) => host.do_send(HostFrame { content }),
            None if self.frame_buffer.len() < MAX_BUFFERED_FRAMES => self.frame_buffer.push(content),
            None => tracing::warn!("Frame buffer full for session {}, dropping frame", self.session_id),
        }
    }

    /// Route a host frame onto the bus the bound transport listens on.
    fn inject_host_text(&self, text: &str) {
        let events = self.session.bridge().events();

        match self.kind {
            HostKind::Popup => match serde_json::from_str::<Value>(text) {
                Ok(data) => {
                    events.post_window_message(&self.origin, data);
                }
                Err(e) => tracing::warn!("Dropping non-JSON frame from popup host {}: {}", self.session_id, e),
            },
            HostKind::Embedded | HostKind::WebView => {
                // Iframe hosts may send the same `embedded` wrapper they receive
                let raw = match serde_json::from_str::<HostMessage>(text) {
                    Ok(HostMessage::Embedded { payload }) => payload,
                    _ => text.to_string(),
                };
                events.on_message_from_native(&raw);
            }
            HostKind::Standalone => {
                tracing::debug!("Standalone session {} ignores host traffic", self.session_id);
            }
        }
    }

    fn dispatch(&mut self, event: MachineEvent) {
        let was_authenticated = self.session.snapshot().context.is_authenticated;
        let logout = matches!(event, MachineEvent::Logout);

        let state = self.session.dispatch(event);
        tracing::debug!("Session {} now in {}", self.session_id, state);

        let is_authenticated = self.session.snapshot().context.is_authenticated;
        if logout && !is_authenticated {
            self.tokens_issued = false;
        }
        if !was_authenticated && is_authenticated && !self.tokens_issued {
            self.issue_tokens();
        }
    }

    fn issue_tokens(&mut self) {
        let subject = self.session_id.to_string();
        let minted = issue_session_tokens(
            &subject,
            self.tokens.access_ttl_secs,
            self.tokens.refresh_ttl_secs,
            self.tokens.secret.as_bytes(),
        );

        match minted {
            Ok(tokens) => match self.session.emit_session_tokens(&tokens) {
                Ok(()) => {
                    self.tokens_issued = true;
                    tracing::info!("Issued session tokens for {}", self.session_id);
                }
                Err(e) => tracing::warn!("Failed to emit tokens for {}: {}", self.session_id, e),
            },
            Err(e) => tracing::error!("Failed to mint tokens for {}: {}", self.session_id, e),
        }
    }

    fn push_snapshot(&self) {
        let Some(surface) = &self.surface else {
            return;
        };
        match serde_json::to_string(&self.session.snapshot()) {
            Ok(content) => surface.do_send(SurfaceFrame { content }),
            Err(e) => tracing::error!("Failed to serialize snapshot for {}: {}", self.session_id, e),
        }
    }
}

impl Actor for SessionActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Session started: {} ({})", self.session_id, self.session.bridge().name());
        if let Some(frames) = self.frames.take() {
            ctx.add_stream(UnboundedReceiverStream::new(frames));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.session.detach();
        tracing::info!("Session stopped: {}", self.session_id);
    }
}

impl StreamHandler<String> for SessionActor {
    fn handle(&mut self, frame: String, _ctx: &mut Self::Context) {
        self.deliver_to_host(frame);
    }

    // The sender lives in the session itself; keep running if it ever ends
    fn finished(&mut self, _ctx: &mut Self::Context) {}
}

impl Handler<AttachHost> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: AttachHost, _ctx: &mut Self::Context) -> Self::Result {
        let buffered: Vec<String> = self
            .frame_buffer
            .drain(..)
            .filter(|content| !is_close_frame(content))
            .collect();
        if !buffered.is_empty() {
            tracing::info!("Sending {} buffered frames for session {}", buffered.len(), self.session_id);
        }
        for content in buffered {
            msg.recipient.do_send(HostFrame { content });
        }
        self.host = Some((msg.connection_id, msg.recipient));
        tracing::info!("Host attached to session {}", self.session_id);
    }
}

impl Handler<DetachHost> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: DetachHost, _ctx: &mut Self::Context) -> Self::Result {
        match &self.host {
            Some((current, _)) if *current == msg.connection_id => self.host = None,
            _ => {
                tracing::debug!("Ignoring detach of replaced host connection for {}", self.session_id);
                return;
            }
        }
        if self.session.snapshot().context.requests.incoming.is_none() {
            tracing::info!("Host left session {}", self.session_id);
            return;
        }
        tracing::info!("Host left session {}; cancelling pending request", self.session_id);
        self.dispatch(MachineEvent::Cancel);
        self.push_snapshot();
    }
}

impl Handler<HostInbound> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: HostInbound, _ctx: &mut Self::Context) -> Self::Result {
        self.inject_host_text(&msg.text);
        if self.session.pump() > 0 {
            self.push_snapshot();
        }
    }
}

impl Handler<AttachSurface> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: AttachSurface, _ctx: &mut Self::Context) -> Self::Result {
        self.surface = Some(msg.recipient);
        tracing::info!("Surface attached to session {}", self.session_id);
        self.push_snapshot();
    }
}

impl Handler<DetachSurface> for SessionActor {
    type Result = ();

    fn handle(&mut self, _msg: DetachSurface, _ctx: &mut Self::Context) -> Self::Result {
        self.surface = None;
        tracing::info!("Surface left session {}", self.session_id);
    }
}

impl Handler<SurfaceEvent> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: SurfaceEvent, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!("Surface event for {}: {}", self.session_id, msg.event.name());
        self.dispatch(msg.event);
        self.push_snapshot();
    }
}

impl Handler<GetSnapshot> for SessionActor {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.session.snapshot())
    }
}

impl Handler<CloseSession> for SessionActor {
    type Result = ();

    fn handle(&mut self, _msg: CloseSession, ctx: &mut Self::Context) -> Self::Result {
        ctx.stop();
    }
}
