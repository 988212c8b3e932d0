// bridge-server/src/actors/host_actor.rs
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use common::SessionConfig;
use uuid::Uuid;

use super::session_actor::{AttachHost, DetachHost, HostFrame, HostInbound, SessionActor};
use super::state_manager::{HostStatusUpdate, StateManagerActor};

/// WebSocket of the page that hosts the surface (opener, parent frame or
/// native app). Its frames are the host side of the bridge.
pub struct HostActor {
    session_id: Uuid,
    connection_id: Uuid,
    session: Addr<SessionActor>,
    state_manager: Addr<StateManagerActor>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    last_heartbeat: Instant,
}

impl HostActor {
    pub fn new(
        session_id: Uuid,
        connection_id: Uuid,
        session: Addr<SessionActor>,
        state_manager: Addr<StateManagerActor>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            session_id,
            connection_id,
            session,
            state_manager,
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(config.heartbeat_timeout_secs),
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.heartbeat_timeout {
                tracing::warn!("Host heartbeat timeout: {}", act.session_id);
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}

impl Actor for HostActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Host connected: {}", self.session_id);
        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);

        self.session.do_send(AttachHost {
            connection_id: self.connection_id,
            recipient: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Host disconnected: {}", self.session_id);

        self.session.do_send(DetachHost {
            connection_id: self.connection_id,
        });
        self.state_manager.do_send(HostStatusUpdate {
            session_id: self.session_id,
            connection_id: self.connection_id,
            connected: false,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for HostActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                tracing::debug!("Frame from host {}: {}", self.session_id, text);

                self.session.do_send(HostInbound {
                    text: text.to_string(),
                });
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Host closing connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!("Host socket protocol error for {}: {}", self.session_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<HostFrame> for HostActor {
    type Result = ();

    fn handle(&mut self, msg: HostFrame, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.content);
    }
}
