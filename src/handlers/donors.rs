use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json, Path};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::handlers::enrich_all;
use crate::models::{common::ApiResponse, donor::CreateDonorRequest};
use crate::services::database::DatabaseService;

#[post("")]
pub async fn create_donor(
    db: Data<DatabaseService>,
    payload: Json<CreateDonorRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let donor = db.create_donor(payload.into_inner())?;
    Ok(HttpResponse::Created().json(ApiResponse::success(donor)))
}

#[get("")]
pub async fn list_donors(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(db.list_donors()?)))
}

#[get("/{donor_id}")]
pub async fn get_donor(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let donor = db.get_donor(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(donor)))
}

#[get("/{donor_id}/subscriptions")]
pub async fn get_donor_subscriptions(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let donor = db.get_donor(&path.into_inner())?;
    let subscriptions = db.list_subscriptions(Some(&donor.id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrich_all(&subscriptions, Utc::now()))))
}
