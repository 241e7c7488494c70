use actix_web::{web, App, HttpServer};
use log::info;

use vault_drive::app_state::AppState;
use vault_drive::service::{delete_service, serve_service, upload_service};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    log4rs::init_file("server_log.yaml", Default::default()).unwrap();

    let state = AppState::new().map_err(std::io::Error::other)?;
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let workers = state.config.server.workers;
    let payload_limit = state.config.server.max_payload_size as usize;
    let mount = state.config.storage.mount.clone();

    info!("Starting server on {}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::PayloadConfig::default().limit(payload_limit))
            .app_data(web::Data::new(state.clone()))
            .route("/files", web::post().to(upload_service))
            .route("/files", web::delete().to(delete_service))
            .route(
                &format!("/{}/{{path:.*}}", mount),
                web::get().to(serve_service),
            )
    })
    .bind((host, port))?
    .workers(workers)
    .run()
    .await
}
