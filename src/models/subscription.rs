use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;
use validator::Validate;

use crate::errors::AppError;
use crate::models::common::RecordStatus;
use crate::status::{
    deserialize_lenient_timestamp, Period, PaymentStatus, PaymentSummary, PaymentTracked, TrackedKind,
};

/// A donor's recurring pledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    /// Stored as written; parsed on every status computation.
    pub period: String,
    #[serde(default, deserialize_with = "deserialize_lenient_timestamp")]
    pub last_payment_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    pub donor_id: Uuid,
    pub amount: Decimal,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub period: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Donor-facing status in the two-value paid/pending vocabulary.
#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription_id: Uuid,
    pub status: &'static str,
    pub payment_status: PaymentStatus,
    pub period: String,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}

impl Subscription {
    pub fn new(request: CreateSubscriptionRequest, default_currency: &str) -> Result<Self, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation("amount: Amount must be greater than 0".to_string()));
        }
        let period: Period = request.period.parse()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            donor_id: request.donor_id,
            amount: request.amount,
            currency: request
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| default_currency.to_string()),
            period: period.to_string(),
            last_payment_at: None,
            is_active: false,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a successful payment. An older payment recorded late never
    /// moves `last_payment_at` backwards.
    pub fn record_payment(&mut self, received_at: DateTime<Utc>) -> Result<(), AppError> {
        if self.status == RecordStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Subscription {} is cancelled",
                self.id
            )));
        }

        if self.last_payment_at.map_or(true, |last| received_at > last) {
            self.last_payment_at = Some(received_at);
        }
        self.is_active = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        if self.status == RecordStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Subscription {} is already cancelled",
                self.id
            )));
        }
        self.status = RecordStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn to_status_response(&self, summary: &PaymentSummary) -> SubscriptionStatusResponse {
        SubscriptionStatusResponse {
            subscription_id: self.id,
            status: summary.payment_status.paid_pending_label(),
            payment_status: summary.payment_status,
            period: self.period.clone(),
            last_payment_at: self.last_payment_at,
            next_due_date: summary.next_due_date,
            days_remaining: summary.days_remaining,
        }
    }
}

impl PaymentTracked for Subscription {
    fn kind(&self) -> TrackedKind {
        TrackedKind::Subscription
    }

    fn period(&self) -> &str {
        &self.period
    }

    fn last_payment_at(&self) -> Option<DateTime<Utc>> {
        self.last_payment_at
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}
