use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod ledger;
mod model;
mod models;
mod registry;
mod routes;

use config::Config;
use db::attendance::MySqlRecordStore;
use db::qr_codes::MySqlQrCodes;
use db::users::MySqlDirectory;
use db::{init_db, migrate, seed_admin};
use ledger::Ledger;
use registry::{CachedDirectory, QrCodeLookup};
use routes::RateLimits;

use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DIRECTORY_CACHE_CAPACITY: u64 = 10_000;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
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

    let pool = init_db(&config.database_url).await?;
    migrate(&pool).await?;
    if let Some((username, password)) = &config.bootstrap_admin {
        seed_admin(&pool, username, password).await?;
    }

    let directory = Arc::new(CachedDirectory::new(
        Arc::new(MySqlDirectory::new(pool.clone())),
        config.directory_cache_ttl,
        DIRECTORY_CACHE_CAPACITY,
    ));
    let ledger = Data::new(Ledger::new(
        Arc::new(MySqlRecordStore::new(pool.clone())),
        directory.clone(),
    ));
    let qr_codes: Arc<dyn QrCodeLookup> = Arc::new(MySqlQrCodes::new(pool.clone()));
    let qr_codes = Data::from(qr_codes);
    let directory = Data::from(directory);

    let limits = Arc::new(RateLimits::from_config(&config)?);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(routes::cors())
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(ledger.clone())
            .app_data(qr_codes.clone())
            .app_data(directory.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .route("/health", web::get().to(api::health::health))
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
