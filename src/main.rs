mod classifier;
mod config;
mod error;
mod handlers;
mod models;
mod service;
mod tokenizer;
mod vectorizer;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::service::SpamhamService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(DEFAULT_CONFIG_PATH)?;

    init_logging(&config.logging.level)?;

    // nothing is served until every artifact has loaded
    let service = SpamhamService::load(&config.models).context("Failed to load models")?;
    let service = web::Data::new(service);

    let (host, port) = config.bind_addr();
    let max_payload = config.server.max_payload;
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(|cfg| handlers::routes(cfg, max_payload))
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}

/// Installs the global subscriber; also routes actix's `log` records.
fn init_logging(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .try_init()
        .map_err(anyhow::Error::msg)
}
