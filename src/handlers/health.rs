use actix_web::{web::Data, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::services::{database::DatabaseService, messaging::MessagingService};

pub async fn health_check(db: Data<DatabaseService>, messaging: Data<MessagingService>) -> HttpResponse {
    let storage = if db.donor_count().is_ok() { "ok" } else { "unavailable" };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "storage": storage,
        "messaging": if messaging.is_dry_run() { "dry-run" } else { "live" },
        "time": Utc::now(),
    }))
}
