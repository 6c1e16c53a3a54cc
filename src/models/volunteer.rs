use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::{normalize_phone, validate_phone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVolunteerRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,
}

impl Volunteer {
    pub fn new(request: CreateVolunteerRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            phone: normalize_phone(&request.phone),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
