use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod heartbeat;
mod lab;
mod model;
mod models;
mod repository;
mod routes;
mod scheduler;
mod settings;
mod utils;

use config::Config;
use db::init_db;
use heartbeat::client::HeartbeatClient;
use heartbeat::status::HeartbeatTracker;
use repository::{AttendanceRepository, mysql::MySqlAttendanceRepository};
use routes::RateLimits;
use scheduler::AutoCheckout;
use settings::SettingsStore;

use crate::docs::ApiDoc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Lab attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    info!("Server starting...");

    let config = Config::from_env()?;
    let limits = RateLimits::from_config(&config)?;

    let pool = init_db(&config.database_url, config.db_timeout).await?;
    let repo: Arc<dyn AttendanceRepository> =
        Arc::new(MySqlAttendanceRepository::new(pool, config.db_timeout));

    let settings = Arc::new(SettingsStore::load(&config.lab_settings_path).await?);
    let tracker = Arc::new(HeartbeatTracker::default());

    let heartbeat = start_heartbeat(&config, tracker.clone());

    let auto_checkout = Arc::new(AutoCheckout::new(repo.clone(), settings.clone()));
    auto_checkout.clone().spawn();

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        let mut app = App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(config.instance.clone()))
            .app_data(Data::from(repo.clone()))
            .app_data(Data::from(settings.clone()))
            .app_data(Data::from(tracker.clone()))
            .app_data(Data::from(auto_checkout.clone()));

        if let Some(client) = &heartbeat {
            app = app.app_data(Data::from(client.clone()));
        }

        let config = config.clone();
        let limits = limits.clone();
        app.service(index)
            .configure(move |cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}

/// Starts the heartbeat loop when enabled and the identity is usable.
fn start_heartbeat(config: &Config, tracker: Arc<HeartbeatTracker>) -> Option<Arc<HeartbeatClient>> {
    if !config.heartbeat.enabled {
        warn!("Heartbeat disabled by HEARTBEAT_ENABLED");
        return None;
    }

    if let Err(errors) = config.instance.validate() {
        error!(?errors, "Instance identity is invalid, heartbeat disabled");
        return None;
    }

    match HeartbeatClient::new(config.instance.clone(), &config.heartbeat, tracker) {
        Ok(client) => {
            let client = Arc::new(client);
            client.clone().spawn();
            Some(client)
        }
        Err(e) => {
            error!(error = %e, "Failed to build heartbeat client, heartbeat disabled");
            None
        }
    }
}
