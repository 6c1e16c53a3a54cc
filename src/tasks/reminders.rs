use std::time::Duration;

use actix_web::web::Data;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{
    common::{RecordRef, RecordStatus},
    notification::{DeliveryStatus, Notification},
};
use crate::services::{
    database::DatabaseService,
    messaging::{box_collection_reminder, subscription_reminder, MessagingService},
};
use crate::status::{summarize, PaymentStatus};

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct ReminderSummary {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReminderSummary {
    fn count(&mut self, notification: &Notification) {
        match notification.delivery_status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Failed => self.failed += 1,
        }
    }
}

/// Runs the reminder pass every `reminder_interval_secs` until the runtime stops.
pub fn spawn_reminder_loop(db: Data<DatabaseService>, messaging: Data<MessagingService>, config: Data<AppConfig>) {
    let period = Duration::from_secs(config.reminder_interval_secs.max(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match run_reminders(&db, &messaging, &config, Utc::now()).await {
                Ok(summary) => log::info!(
                    "Reminder pass finished: {} sent, {} failed, {} skipped",
                    summary.sent,
                    summary.failed,
                    summary.skipped
                ),
                Err(err) => log::error!("Reminder pass aborted: {}", err),
            }
        }
    });
}

/// One pass over subscriptions and boxes. Delivery failures are stored on
/// the notification; only storage errors abort the pass.
pub async fn run_reminders(
    db: &DatabaseService,
    messaging: &MessagingService,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<ReminderSummary, AppError> {
    let mut summary = ReminderSummary::default();

    for subscription in db.list_subscriptions(None)? {
        if subscription.status != RecordStatus::Active {
            continue;
        }
        let status = match summarize(&subscription, now) {
            Ok(status) => status,
            Err(err) => {
                log::warn!("Skipping reminder for subscription {}: {}", subscription.id, err);
                summary.skipped += 1;
                continue;
            }
        };

        let due = match status.payment_status {
            PaymentStatus::Pending | PaymentStatus::Overdue => true,
            PaymentStatus::Paid => status.days_remaining.map_or(false, |d| d <= config.reminder_lead_days),
            PaymentStatus::Dead => false,
        };
        if !due {
            continue;
        }

        let donor = match db.get_donor(&subscription.donor_id) {
            Ok(donor) => donor,
            Err(AppError::NotFound(_)) => {
                log::warn!("Subscription {} has no donor on record", subscription.id);
                summary.skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let message = subscription_reminder(&config.organization_name, &donor.name, &subscription, &status);
        let notification = deliver(
            db,
            messaging,
            donor.phone,
            RecordRef::Subscription(subscription.id),
            message,
        )
        .await?;
        summary.count(&notification);
    }

    for collection_box in db.list_boxes(None)? {
        if collection_box.status != RecordStatus::Active {
            continue;
        }
        match summarize(&collection_box, now) {
            Ok(status) if status.payment_status == PaymentStatus::Overdue => {}
            Ok(_) => continue,
            Err(err) => {
                log::warn!("Skipping reminder for box {}: {}", collection_box.box_number, err);
                summary.skipped += 1;
                continue;
            }
        }

        let recipient = match collection_box.volunteer_id {
            Some(volunteer_id) => match db.get_volunteer(&volunteer_id) {
                Ok(volunteer) => volunteer.phone,
                Err(AppError::NotFound(_)) => collection_box.holder_phone.clone(),
                Err(err) => return Err(err),
            },
            None => collection_box.holder_phone.clone(),
        };

        let message = box_collection_reminder(&config.organization_name, &collection_box);
        let notification = deliver(
            db,
            messaging,
            recipient,
            RecordRef::CollectionBox(collection_box.id),
            message,
        )
        .await?;
        summary.count(&notification);
    }

    Ok(summary)
}

async fn deliver(
    db: &DatabaseService,
    messaging: &MessagingService,
    recipient: String,
    subject: RecordRef,
    message: String,
) -> Result<Notification, AppError> {
    let outcome = messaging
        .send_text(&recipient, &message)
        .await
        .map_err(|err| {
            log::warn!("Reminder to {} for {} failed: {}", recipient, subject, err);
            err.to_string()
        });
    db.store_notification(Notification::new(recipient, subject, message, outcome))
}
