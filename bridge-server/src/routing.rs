// bridge-server/src/routing.rs
use actix::Addr;
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use actix_web_actors::ws;
use auth_core::HostKind;
use common::Config;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::actors::{
    host_actor::HostActor,
    state_manager::{FindSession, OpenSession, StateManagerActor},
    surface_actor::SurfaceActor,
};
use crate::error::ServerError;

/// Configure routes for the bridge server
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(web::resource("/ws/host/{session_id}").route(web::get().to(host_ws_route)))
        .service(web::resource("/ws/surface/{session_id}").route(web::get().to(surface_ws_route)));
}

#[derive(Debug, Deserialize)]
pub struct HostQuery {
    kind: String,
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

fn parse_session_id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!("Invalid session ID format in WebSocket connection: {}", raw);
        ServerError::InvalidSessionId(raw.to_string())
    })
}

/// Origin the peer's user agent stamped on the handshake. Hosts that send
/// none (native apps) are seen as "null".
fn handshake_origin(req: &HttpRequest) -> String {
    req.headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("null")
        .to_string()
}

/// Host socket: `?kind=popup|embedded|webview|standalone`
async fn host_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<(String,)>,
    query: web::Query<HostQuery>,
    state_manager: web::Data<Addr<StateManagerActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, actix_web::Error> {
    let session_id = parse_session_id(&path.0)?;
    let kind: HostKind = query
        .kind
        .parse()
        .map_err(|_| ServerError::InvalidHostKind(query.kind.clone()))?;

    // The popup policy checks this value, so it never comes from the query
    let origin = handshake_origin(&req);
    let connection_id = Uuid::new_v4();

    let session = state_manager
        .send(OpenSession { session_id, connection_id, kind, origin })
        .await
        .map_err(ServerError::from)??;

    let host = HostActor::new(
        session_id,
        connection_id,
        session,
        state_manager.get_ref().clone(),
        &config.sessions,
    );
    ws::start(host, &req, stream)
}

/// Approval UI socket, authorized with the pre-shared surface token.
async fn surface_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<(String,)>,
    state_manager: web::Data<Addr<StateManagerActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, actix_web::Error> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok());

    if token != Some(config.surface_token.as_str()) {
        tracing::warn!("Surface connection attempt with missing or invalid token");
        return Err(ServerError::Unauthorized.into());
    }

    let session_id = parse_session_id(&path.0)?;
    let session = state_manager
        .send(FindSession { session_id })
        .await
        .map_err(ServerError::from)?
        .ok_or(ServerError::SessionNotFound(session_id))?;

    let surface = SurfaceActor::new(session_id, session, &config.sessions);
    ws::start(surface, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor;
    use actix_web::{http::StatusCode, test, App};
    use common::{BridgeConfig, SessionConfig, TokenConfig};

    fn state_manager() -> Addr<StateManagerActor> {
        StateManagerActor::new(BridgeConfig::default(), TokenConfig::default(), SessionConfig::default()).start()
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().configure(routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_handshake_rejections() {
        let config = Config::default();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_manager()))
                .app_data(web::Data::new(config.clone()))
                .configure(routes),
        )
        .await;

        let session_id = Uuid::new_v4();

        let req = test::TestRequest::get()
            .uri(&format!("/ws/surface/{}", session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri(&format!("/ws/surface/{}", session_id))
            .insert_header(("Authorization", config.surface_token.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/ws/host/not-a-uuid?kind=popup")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/ws/host/{}?kind=tab", session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    fn host_handshake(session_id: Uuid, query: &str, origin: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(&format!("/ws/host/{}?{}", session_id, query))
            .insert_header((header::ORIGIN, origin))
            .insert_header((header::UPGRADE, "websocket"))
            .insert_header((header::CONNECTION, "upgrade"))
            .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
            .insert_header((header::SEC_WEBSOCKET_KEY, "x3JJHMbDL1EzLkh9GBhXDw=="))
    }

    #[actix_web::test]
    async fn test_host_origin_comes_from_handshake_header() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_manager()))
                .app_data(web::Data::new(Config::default()))
                .configure(routes),
        )
        .await;
        let session_id = Uuid::new_v4();

        // A claimed origin in the query is not what the session is bound to
        let req = host_handshake(session_id, "kind=popup&origin=https://dapp.example", "https://evil.example");
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::SWITCHING_PROTOCOLS);

        let req = host_handshake(session_id, "kind=popup", "https://dapp.example");
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        let req = host_handshake(session_id, "kind=popup", "https://evil.example");
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
