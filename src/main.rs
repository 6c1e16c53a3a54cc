mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod status;
mod tasks;

use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_cors::Cors;
use anyhow::Context;
use dotenv::dotenv;

use services::{
    database::DatabaseService,
    gateway::GatewayService,
    messaging::MessagingService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().context("GATEWAY_WEBHOOK_SECRET must be set")?;

    let database_service = web::Data::new(DatabaseService::new());
    let gateway_service = web::Data::new(GatewayService::new(config.gateway.clone()));
    let messaging_service = web::Data::new(MessagingService::new(config.messaging.clone()));
    let app_config = web::Data::new(config.app.clone());

    if messaging_service.is_dry_run() {
        log::warn!("Messaging credentials not set; reminders will only be logged");
    }

    tasks::reminders::spawn_reminder_loop(
        database_service.clone(),
        messaging_service.clone(),
        app_config.clone(),
    );

    let bind_address = (config.host.clone(), config.port);
    log::info!(
        "Starting donation server for {} on {}:{}",
        config.app.organization_name,
        bind_address.0,
        bind_address.1
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials()
            )
            .app_data(database_service.clone())
            .app_data(gateway_service.clone())
            .app_data(messaging_service.clone())
            .app_data(app_config.clone())
            .service(web::scope("/api/v1").configure(handlers::configure))
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
