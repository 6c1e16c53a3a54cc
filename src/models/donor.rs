use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::{normalize_phone, validate_phone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDonorRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl Donor {
    pub fn new(request: CreateDonorRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            phone: normalize_phone(&request.phone),
            email: request.email.map(|email| email.to_lowercase()),
            created_at: now,
            updated_at: now,
        }
    }
}
