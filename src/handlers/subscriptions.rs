use actix_web::{get, post, HttpResponse};
use actix_web::web::{Data, Json, Path, Query};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::handlers::enrich_all;
use crate::models::{
    common::{ApiResponse, PaginatedResponse, PaginationQuery, RecordRef},
    donation::{Donation, RecordPaymentRequest, RecordPaymentResponse},
    subscription::{CreateSubscriptionRequest, SubscriptionListQuery},
};
use crate::services::{database::DatabaseService, gateway::GatewayService};
use crate::status::{enrich, summarize, PaymentStatus};

#[post("")]
pub async fn create_subscription(
    db: Data<DatabaseService>,
    gateway: Data<GatewayService>,
    payload: Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let subscription = db.create_subscription(payload.into_inner(), gateway.currency())?;
    let enriched = enrich(&subscription, Utc::now())?;
    Ok(HttpResponse::Created().json(ApiResponse::success(enriched)))
}

/// `?status=` filters on the computed payment status (paid, pending,
/// overdue, dead).
#[get("")]
pub async fn list_subscriptions(
    db: Data<DatabaseService>,
    query: Query<SubscriptionListQuery>,
) -> Result<HttpResponse, AppError> {
    let wanted = query
        .status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let subscriptions = db.list_subscriptions(None)?;
    let enriched: Vec<_> = enrich_all(&subscriptions, Utc::now())
        .into_iter()
        .filter(|s| wanted.map_or(true, |status| s.summary.payment_status == status))
        .collect();

    let pagination = PaginationQuery {
        page: query.page,
        limit: query.limit,
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse::paginate(enriched, &pagination))))
}

#[get("/{subscription_id}")]
pub async fn get_subscription(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let subscription = db.get_subscription(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrich(&subscription, Utc::now())?)))
}

#[get("/{subscription_id}/status")]
pub async fn get_subscription_status(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let subscription = db.get_subscription(&path.into_inner())?;
    let summary = summarize(&subscription, Utc::now())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(subscription.to_status_response(&summary))))
}

#[post("/{subscription_id}/cancel")]
pub async fn cancel_subscription(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let subscription = db.cancel_subscription(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        subscription,
        "Subscription cancelled".to_string(),
    )))
}

#[post("/{subscription_id}/payments")]
pub async fn record_payment(
    db: Data<DatabaseService>,
    gateway: Data<GatewayService>,
    path: Path<Uuid>,
    payload: Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let subscription_id = path.into_inner();
    let now = Utc::now();

    let donation = Donation::new(
        RecordRef::Subscription(subscription_id),
        payload.into_inner(),
        gateway.currency(),
        now,
    )?;
    let (donation, subscription) = db.record_subscription_payment(&subscription_id, donation)?;

    Ok(HttpResponse::Created().json(ApiResponse::success(RecordPaymentResponse {
        donation,
        record: enrich(&subscription, now)?,
    })))
}

#[get("/{subscription_id}/payments")]
pub async fn list_payments(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse, AppError> {
    let subscription = db.get_subscription(&path.into_inner())?;
    let donations = db.list_donations(Some(&RecordRef::Subscription(subscription.id)))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(donations)))
}
