use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::common::{normalize_phone, validate_phone, RecordStatus};
use crate::status::{deserialize_lenient_timestamp, Period, PaymentTracked, TrackedKind};

/// Physical collection box placed with a holder (a shop, a household) and
/// emptied periodically by a volunteer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionBox {
    pub id: Uuid,
    pub box_number: String,
    pub holder_name: String,
    pub holder_phone: String,
    pub location: Option<String>,
    pub volunteer_id: Option<Uuid>,
    pub period: String,
    #[serde(default, deserialize_with = "deserialize_lenient_timestamp")]
    pub last_payment_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoxRequest {
    #[validate(length(min = 1, max = 32, message = "Box number must be between 1 and 32 characters"))]
    pub box_number: String,

    #[validate(length(min = 2, max = 100, message = "Holder name must be between 2 and 100 characters"))]
    pub holder_name: String,

    #[validate(custom = "validate_phone")]
    pub holder_phone: String,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,

    pub volunteer_id: Option<Uuid>,

    /// Defaults to monthly.
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBoxRequest {
    pub volunteer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BoxListQuery {
    /// Box vocabulary: active, overdue or dead.
    pub status: Option<String>,
    pub volunteer_id: Option<Uuid>,
}

impl CollectionBox {
    pub fn new(request: CreateBoxRequest) -> Result<Self, AppError> {
        let period: Period = request.period.as_deref().unwrap_or("monthly").parse()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            box_number: request.box_number.trim().to_uppercase(),
            holder_name: request.holder_name.trim().to_string(),
            holder_phone: normalize_phone(&request.holder_phone),
            location: request.location,
            volunteer_id: request.volunteer_id,
            period: period.to_string(),
            last_payment_at: None,
            is_active: false,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// A collection from the box counts as a payment.
    pub fn record_collection(&mut self, collected_at: DateTime<Utc>) -> Result<(), AppError> {
        if self.status == RecordStatus::Cancelled {
            return Err(AppError::Conflict(format!(
                "Box {} has been withdrawn",
                self.box_number
            )));
        }

        if self.last_payment_at.map_or(true, |last| collected_at > last) {
            self.last_payment_at = Some(collected_at);
        }
        self.is_active = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn assign(&mut self, volunteer_id: Uuid) {
        self.volunteer_id = Some(volunteer_id);
        self.updated_at = Utc::now();
    }
}

impl PaymentTracked for CollectionBox {
    fn kind(&self) -> TrackedKind {
        TrackedKind::CollectionBox
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
