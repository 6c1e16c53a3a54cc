use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json, Path, Query};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::handlers::enrich_all;
use crate::models::{
    collection_box::{AssignBoxRequest, BoxListQuery, CreateBoxRequest},
    common::{ApiResponse, RecordRef},
    donation::{Donation, RecordPaymentRequest, RecordPaymentResponse},
};
use crate::services::{database::DatabaseService, gateway::GatewayService};
use crate::status::{enrich, PaymentStatus};

#[post("")]
pub async fn create_box(
    db: Data<DatabaseService>,
    payload: Json<CreateBoxRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let collection_box = db.create_box(payload.into_inner())?;
    Ok(HttpResponse::Created().json(ApiResponse::success(enrich(&collection_box, Utc::now())?)))
}

/// `?status=` uses the box vocabulary: active, overdue, dead.
#[get("")]
pub async fn list_boxes(db: Data<DatabaseService>, query: Query<BoxListQuery>) -> Result<HttpResponse, AppError> {
    let wanted = match query.status.as_deref() {
        Some(label) => Some(PaymentStatus::from_box_label(label).ok_or_else(|| {
            AppError::Validation(format!("Unknown box status: {}", label))
        })?),
        None => None,
    };

    let boxes = db.list_boxes(query.volunteer_id.as_ref())?;
    let enriched: Vec<_> = enrich_all(&boxes, Utc::now())
        .into_iter()
        .filter(|b| wanted.map_or(true, |status| b.summary.payment_status == status))
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(enriched)))
}

#[get("/{box_id}")]
pub async fn get_box(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let collection_box = db.get_box(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrich(&collection_box, Utc::now())?)))
}

#[post("/{box_id}/assign")]
pub async fn assign_box(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
    payload: Json<AssignBoxRequest>,
) -> Result<HttpResponse, AppError> {
    let collection_box = db.assign_box(&path.into_inner(), &payload.volunteer_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrich(&collection_box, Utc::now())?)))
}

#[post("/{box_id}/payments")]
pub async fn record_collection(
    db: Data<DatabaseService>,
    gateway: Data<GatewayService>,
    path: Path<Uuid>,
    payload: Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let box_id = path.into_inner();
    let now = Utc::now();

    let donation = Donation::new(
        RecordRef::CollectionBox(box_id),
        payload.into_inner(),
        gateway.currency(),
        now,
    )?;
    let (donation, collection_box) = db.record_box_collection(&box_id, donation)?;

    Ok(HttpResponse::Created().json(ApiResponse::success(RecordPaymentResponse {
        donation,
        record: enrich(&collection_box, now)?,
    })))
}

#[get("/{box_id}/payments")]
pub async fn list_collections(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let collection_box = db.get_box(&path.into_inner())?;
    let donations = db.list_donations(Some(&RecordRef::CollectionBox(collection_box.id)))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(donations)))
}
