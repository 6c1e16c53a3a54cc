use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::common::RecordRef;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// One reminder attempt, kept whether or not it was delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub subject: RecordRef,
    pub message: String,
    pub delivery_status: DeliveryStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: String, subject: RecordRef, message: String, outcome: Result<(), String>) -> Self {
        let (delivery_status, error) = match outcome {
            Ok(()) => (DeliveryStatus::Sent, None),
            Err(reason) => (DeliveryStatus::Failed, Some(reason)),
        };

        Self {
            id: Uuid::new_v4(),
            recipient,
            subject,
            message,
            delivery_status,
            error,
            created_at: Utc::now(),
        }
    }
}
