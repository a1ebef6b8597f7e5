use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod client;
mod config;
mod docs;
mod error;
mod model;
mod routes;
mod schedule;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;

use crate::client::ScheduleClient;
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::health_log::{self, HealthLog};
use crate::utils::session_store::SessionStore;
use crate::utils::view_cache::ViewRegistry;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "SKUD schedule service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = Arc::new(
        SessionStore::load(&config.session_store_path).context("failed to load session store")?,
    );
    info!(path = %store.path().display(), "Session store loaded");
    let client = Arc::new(
        ScheduleClient::new(&config.upstream_url, config.upstream_timeout, store.clone())
            .context("failed to build upstream client")?,
    );
    let registry = ViewRegistry::new(
        config.max_view_sessions,
        config.view_session_ttl,
        config.default_per_page,
    );
    let health = Arc::new(HealthLog::new(config.health_log_capacity));
    let limiters = Limiters::new(&config)?;

    actix_web::rt::spawn(health_log::poll_health(
        client.clone(),
        health.clone(),
        config.health_poll_interval,
    ));

    let server_addr = config.server_addr.clone();
    info!(upstream = %config.upstream_url, addr = %server_addr, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(store.clone()))
            .app_data(Data::from(client.clone()))
            .app_data(Data::new(registry.clone()))
            .app_data(Data::from(health.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, limiters.clone()))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
