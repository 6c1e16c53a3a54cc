use actix_web::{get, HttpResponse};
use actix_web::web::Data;

use crate::errors::AppError;
use crate::models::common::ApiResponse;
use crate::services::database::DatabaseService;

#[get("")]
pub async fn list_notifications(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(db.list_notifications()?)))
}
