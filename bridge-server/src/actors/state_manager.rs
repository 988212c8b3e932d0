// bridge-server/src/actors/state_manager.rs
use std::time::{Duration, Instant};

use actix::{Actor, Addr, AsyncContext, Context, Handler, Message};
use auth_core::HostKind;
use chrono::{DateTime, Utc};
use common::{BridgeConfig, SessionConfig, TokenConfig};
use dashmap::DashMap;
use uuid::Uuid;

use super::session_actor::{CloseSession, SessionActor};
use crate::error::ServerError;

/// Find the session for a host, creating it on first contact. A reconnect
/// must come from the origin the session was opened with.
#[derive(Message)]
#[rtype(result = "Result<Addr<SessionActor>, ServerError>")]
pub struct OpenSession {
    pub session_id: Uuid,
    pub connection_id: Uuid,
    pub kind: HostKind,
    pub origin: String,
}

#[derive(Message)]
#[rtype(result = "Option<Addr<SessionActor>>")]
pub struct FindSession {
    pub session_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct CountSessions;

/// Updates from a connection other than the session's current host are
/// ignored.
#[derive(Message)]
#[rtype(result = "()")]
pub struct HostStatusUpdate {
    pub session_id: Uuid,
    pub connection_id: Uuid,
    pub connected: bool,
}

/// Run one cleanup pass now instead of waiting for the interval.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SweepSessions;

struct SessionData {
    addr: Addr<SessionActor>,
    kind: HostKind,
    origin: String,
    host_connection: Uuid,
    host_connected: bool,
    last_seen: Instant,
    opened_at: DateTime<Utc>,
}

/// Registry of live sessions. Sessions whose host has been gone for longer
/// than the configured TTL are stopped and removed.
pub struct StateManagerActor {
    sessions: DashMap<Uuid, SessionData>,
    bridge: BridgeConfig,
    tokens: TokenConfig,
    config: SessionConfig,
}

impl StateManagerActor {
    pub fn new(bridge: BridgeConfig, tokens: TokenConfig, config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            bridge,
            tokens,
            config,
        }
    }

    fn start_cleanup_task(&self, ctx: &mut Context<Self>) {
        let interval = Duration::from_secs(self.config.cleanup_interval_secs);
        ctx.run_interval(interval, |act, _ctx| act.sweep());
    }

    fn sweep(&self) {
        let now = Instant::now();
        let ttl = Duration::from_secs(self.config.ttl_secs);

        let stale: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| !entry.host_connected && now.duration_since(entry.last_seen) >= ttl)
            .map(|entry| *entry.key())
            .collect();

        for session_id in stale {
            if let Some((_, data)) = self.sessions.remove(&session_id) {
                data.addr.do_send(CloseSession);
                tracing::info!(
                    "Removed stale {} session: {} (opened {})",
                    data.kind,
                    session_id,
                    data.opened_at.to_rfc3339()
                );
            }
        }
    }
}

impl Actor for StateManagerActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_cleanup_task(ctx);
    }
}

impl Handler<OpenSession> for StateManagerActor {
    type Result = Result<Addr<SessionActor>, ServerError>;

    fn handle(&mut self, msg: OpenSession, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(mut entry) = self.sessions.get_mut(&msg.session_id) {
            if entry.origin != msg.origin {
                tracing::warn!(
                    "Rejected host for session {} from {} (opened by {})",
                    msg.session_id,
                    msg.origin,
                    entry.origin
                );
                return Err(ServerError::OriginMismatch(msg.session_id));
            }
            if entry.kind != msg.kind {
                tracing::warn!(
                    "Session {} reopened as {}; keeping its {} transport",
                    msg.session_id,
                    msg.kind,
                    entry.kind
                );
            }
            entry.host_connection = msg.connection_id;
            entry.host_connected = true;
            entry.last_seen = Instant::now();
            tracing::info!("Host reconnected to session: {}", msg.session_id);
            return Ok(entry.addr.clone());
        }

        let addr = SessionActor::new(
            msg.session_id,
            msg.kind,
            msg.origin.clone(),
            &self.bridge,
            self.tokens.clone(),
        )
        .start();

        self.sessions.insert(
            msg.session_id,
            SessionData {
                addr: addr.clone(),
                kind: msg.kind,
                origin: msg.origin,
                host_connection: msg.connection_id,
                host_connected: true,
                last_seen: Instant::now(),
                opened_at: Utc::now(),
            },
        );
        tracing::info!("Session registered: {} ({})", msg.session_id, msg.kind);

        Ok(addr)
    }
}

impl Handler<FindSession> for StateManagerActor {
    type Result = Option<Addr<SessionActor>>;

    fn handle(&mut self, msg: FindSession, _ctx: &mut Self::Context) -> Self::Result {
        self.sessions.get(&msg.session_id).map(|entry| entry.addr.clone())
    }
}

impl Handler<HostStatusUpdate> for StateManagerActor {
    type Result = ();

    fn handle(&mut self, msg: HostStatusUpdate, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(mut entry) = self.sessions.get_mut(&msg.session_id) {
            if entry.host_connection != msg.connection_id {
                tracing::debug!("Ignoring status of replaced host connection for {}", msg.session_id);
                return;
            }
            entry.host_connected = msg.connected;
            entry.last_seen = Instant::now();

            tracing::debug!("Host status updated: {} (connected: {})", msg.session_id, msg.connected);
        }
    }
}

impl Handler<CountSessions> for StateManagerActor {
    type Result = usize;

    fn handle(&mut self, _msg: CountSessions, _ctx: &mut Self::Context) -> Self::Result {
        self.sessions.len()
    }
}

impl Handler<SweepSessions> for StateManagerActor {
    type Result = ();

    fn handle(&mut self, _msg: SweepSessions, _ctx: &mut Self::Context) -> Self::Result {
        self.sweep();
    }
}
