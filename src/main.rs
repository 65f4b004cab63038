use std::io;

use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use log::info;

use file_depot::api;
use file_depot::app_state::AppState;
use file_depot::config::AppConfig;
use file_depot::logging;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let (config, source) = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    logging::init(&config.logging);
    config.log_summary(&source);

    let app_state = AppState::from_config(config.clone())
        .await
        .map_err(|e| io::Error::other(format!("Failed to prepare storage directory: {}", e)))?;

    let server = &config.server;
    info!("File server running on {}:{}", server.host, server.port);
    info!("Files stored in {}", app_state.file_service.base_dir().display());

    let cors_permissive = server.cors_permissive;
    HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(cors_permissive, Cors::permissive()))
            .wrap(Logger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(api::configure)
    })
    .workers(server.workers)
    .bind((server.host.as_str(), server.port))?
    .run()
    .await
}
