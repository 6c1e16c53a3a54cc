use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::handlers::enrich_all;
use crate::models::{common::ApiResponse, volunteer::CreateVolunteerRequest};
use crate::services::database::DatabaseService;

#[post("")]
pub async fn create_volunteer(
    db: Data<DatabaseService>,
    payload: Json<CreateVolunteerRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let volunteer = db.create_volunteer(payload.into_inner())?;
    Ok(HttpResponse::Created().json(ApiResponse::success(volunteer)))
}

#[get("")]
pub async fn list_volunteers(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(db.list_volunteers()?)))
}

#[get("/{volunteer_id}/boxes")]
pub async fn get_volunteer_boxes(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let volunteer = db.get_volunteer(&path.into_inner())?;
    let boxes = db.list_boxes(Some(&volunteer.id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrich_all(&boxes, Utc::now()))))
}
