use actix_web::{post, HttpResponse};
use actix_web::web::Data;
use chrono::Utc;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::common::ApiResponse;
use crate::services::{database::DatabaseService, messaging::MessagingService};
use crate::tasks::reminders;

/// Runs a reminder pass now instead of waiting for the next tick.
#[post("/run")]
pub async fn run_reminders(
    db: Data<DatabaseService>,
    messaging: Data<MessagingService>,
    config: Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let summary = reminders::run_reminders(&db, &messaging, &config, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        summary,
        "Reminder pass completed".to_string(),
    )))
}
