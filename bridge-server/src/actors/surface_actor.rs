// bridge-server/src/actors/surface_actor.rs
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use auth_core::MachineEvent;
use common::SessionConfig;
use serde_json::json;
use uuid::Uuid;

use super::session_actor::{AttachSurface, DetachSurface, SessionActor, SurfaceEvent, SurfaceFrame};

/// WebSocket of the approval UI. Inbound frames are machine events; the
/// session answers each one with a fresh snapshot.
pub struct SurfaceActor {
    session_id: Uuid,
    session: Addr<SessionActor>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    last_heartbeat: Instant,
}

impl SurfaceActor {
    pub fn new(session_id: Uuid, session: Addr<SessionActor>, config: &SessionConfig) -> Self {
        Self {
            session_id,
            session,
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(config.heartbeat_timeout_secs),
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.heartbeat_timeout {
                tracing::warn!("Surface heartbeat timeout: {}", act.session_id);
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}

impl Actor for SurfaceActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Surface connected: {}", self.session_id);
        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);

        self.session.do_send(AttachSurface {
            recipient: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Surface disconnected: {}", self.session_id);
        self.session.do_send(DetachSurface);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SurfaceActor {
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

                match serde_json::from_str::<MachineEvent>(&text) {
                    Ok(event) => self.session.do_send(SurfaceEvent { event }),
                    Err(e) => {
                        tracing::warn!("Failed to parse surface event for {}: {}", self.session_id, e);
                        ctx.text(json!({ "error": format!("invalid event: {}", e) }).to_string());
                    }
                }
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Surface closing connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!("Surface socket protocol error for {}: {}", self.session_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<SurfaceFrame> for SurfaceActor {
    type Result = ();

    fn handle(&mut self, msg: SurfaceFrame, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.content);
    }
}
