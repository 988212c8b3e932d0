// bridge-server/src/main.rs

mod actors;
mod error;
mod routing;
mod socket_host;

use actix::Actor;
use actix_web::{web, App, HttpServer};
use actors::state_manager::StateManagerActor;
use common::{setup_tracing, Config};
use routing::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let (config, source) = Config::from_env();
    setup_tracing(&config.log_level);
    source.log();

    let server_addr = config.server_addr.clone();

    let state_manager = StateManagerActor::new(
        config.bridge.clone(),
        config.tokens.clone(),
        config.sessions.clone(),
    )
    .start();

    tracing::info!("Starting bridge server on {}", server_addr);
    if config.bridge.allowed_origins.is_empty() {
        tracing::warn!("No allowed origins configured; popup hosts from any origin are accepted");
    }

    let config_data = web::Data::new(config);
    let state_manager_data = web::Data::new(state_manager);

    HttpServer::new(move || {
        App::new()
            .app_data(state_manager_data.clone())
            .app_data(config_data.clone())
            .configure(routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
