mod config;
mod context;
mod db;
mod errors;
mod middleware;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::context::AppContext;
use crate::middleware::RequestLogger;
use crate::services::mail_service::LogMailer;
use crate::utils::clock::SystemClock;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    info!("connecting to database");
    let db = db::establish_connection(&settings)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()))?;
    info!("database connected");

    if settings.init_schema {
        db::create_schema(&db)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        info!("schema ready");
    }

    let bind_addr = settings.bind_addr.clone();
    let mailer = Arc::new(LogMailer::new(settings.mail_default_sender.clone()));
    let ctx = AppContext::new(db.clone(), mailer, Arc::new(SystemClock), settings);
    let data = web::Data::new(ctx);

    info!(addr = %bind_addr, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(data.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    info!("server stopped, closing database");
    if let Err(e) = db.close().await {
        error!(error = %e, "failed to close database");
    }
    Ok(())
}
