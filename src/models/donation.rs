use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use validator::Validate;

use crate::errors::AppError;
use crate::models::common::{PaymentMethod, RecordRef};

/// Tolerated lead of a payment's `received_at` over the server clock.
const MAX_CLOCK_SKEW_MINUTES: i64 = 5;

/// A successful payment against a subscription or a box collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub target: RecordRef,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway_reference: Option<String>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub method: Option<PaymentMethod>,
    #[validate(length(min = 1, max = 64, message = "Gateway reference must be between 1 and 64 characters"))]
    pub gateway_reference: Option<String>,
    /// Defaults to the time the request is handled.
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse<T> {
    pub donation: Donation,
    pub record: T,
}

/// Gateway webhook body. Only `payment.captured` events carry a payment
/// the service records.
#[derive(Debug, Deserialize)]
pub struct GatewayWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: GatewayWebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayWebhookPayload {
    pub payment: Option<GatewayPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct GatewayPaymentWrapper {
    pub entity: GatewayPayment,
}

#[derive(Debug, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub method: Option<String>,
    /// Unix seconds.
    pub created_at: Option<i64>,
    #[serde(default)]
    pub notes: GatewayNotes,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayNotes {
    pub subscription_id: Option<Uuid>,
    pub box_id: Option<Uuid>,
}

impl Donation {
    pub fn new(
        target: RecordRef,
        request: RecordPaymentRequest,
        default_currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation("amount: Amount must be greater than 0".to_string()));
        }

        let received_at = request.received_at.unwrap_or(now);
        if received_at > now + Duration::minutes(MAX_CLOCK_SKEW_MINUTES) {
            return Err(AppError::Validation(format!(
                "received_at: Payment date {} is in the future",
                received_at.to_rfc3339()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            target,
            amount: request.amount,
            currency: request
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| default_currency.to_string()),
            method: request.method.unwrap_or(PaymentMethod::Cash),
            gateway_reference: request.gateway_reference,
            received_at,
            created_at: now,
        })
    }
}
