use std::collections::BTreeMap;

use actix_web::{get, HttpResponse};
use actix_web::web::Data;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    collection_box::CollectionBox,
    common::{ApiResponse, RecordStatus},
    donation::Donation,
    subscription::Subscription,
};
use crate::services::database::DatabaseService;
use crate::status::summarize;

#[derive(Debug, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub donors: usize,
    pub volunteers: usize,
    /// Live subscriptions by computed status; cancelled ones are only counted.
    pub subscriptions: BTreeMap<String, usize>,
    pub cancelled_subscriptions: usize,
    /// Boxes by the active/overdue/dead vocabulary.
    pub boxes: BTreeMap<String, usize>,
    /// Total received per currency.
    pub collected: BTreeMap<String, Decimal>,
    pub generated_at: DateTime<Utc>,
}

pub fn build_summary(
    subscriptions: &[Subscription],
    boxes: &[CollectionBox],
    donations: &[Donation],
    donors: usize,
    volunteers: usize,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let mut subscription_counts = BTreeMap::new();
    let mut cancelled_subscriptions = 0;
    for subscription in subscriptions {
        if subscription.status == RecordStatus::Cancelled {
            cancelled_subscriptions += 1;
            continue;
        }
        let label = match summarize(subscription, now) {
            Ok(summary) => summary.status_label(),
            Err(_) => "invalid",
        };
        *subscription_counts.entry(label.to_string()).or_insert(0) += 1;
    }

    let mut box_counts = BTreeMap::new();
    for collection_box in boxes.iter().filter(|b| b.status == RecordStatus::Active) {
        let label = match summarize(collection_box, now) {
            Ok(summary) => summary.status_label(),
            Err(_) => "invalid",
        };
        *box_counts.entry(label.to_string()).or_insert(0) += 1;
    }

    let mut collected = BTreeMap::new();
    for donation in donations {
        *collected.entry(donation.currency.clone()).or_insert(Decimal::ZERO) += donation.amount;
    }

    DashboardSummary {
        donors,
        volunteers,
        subscriptions: subscription_counts,
        cancelled_subscriptions,
        boxes: box_counts,
        collected,
        generated_at: now,
    }
}

#[get("")]
pub async fn get_dashboard(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    let summary = build_summary(
        &db.list_subscriptions(None)?,
        &db.list_boxes(None)?,
        &db.list_donations(None)?,
        db.donor_count()?,
        db.volunteer_count()?,
        Utc::now(),
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        collection_box::CreateBoxRequest,
        common::RecordRef,
        donation::RecordPaymentRequest,
        subscription::CreateSubscriptionRequest,
    };
    use chrono::Duration;
    use uuid::Uuid;

    fn subscription(period: &str, days_ago: Option<i64>, now: DateTime<Utc>) -> Subscription {
        let mut subscription = Subscription::new(
            CreateSubscriptionRequest {
                donor_id: Uuid::new_v4(),
                amount: Decimal::new(100, 0),
                currency: None,
                period: "monthly".to_string(),
            },
            "INR",
        )
        .unwrap();
        subscription.period = period.to_string();
        if let Some(days) = days_ago {
            subscription.record_payment(now - Duration::days(days)).unwrap();
        }
        subscription
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let mut cancelled = subscription("monthly", Some(2), now);
        cancelled.cancel().unwrap();

        let subscriptions = vec![
            subscription("monthly", Some(2), now),
            subscription("monthly", Some(30), now),
            subscription("weekly", Some(8), now),
            subscription("semiannual", Some(1), now),
            cancelled,
        ];

        let mut stale = CollectionBox::new(CreateBoxRequest {
            box_number: "S-1".to_string(),
            holder_name: "Old Holder".to_string(),
            holder_phone: "9000000100".to_string(),
            location: None,
            volunteer_id: None,
            period: None,
        })
        .unwrap();
        stale.record_collection(now - Duration::days(200)).unwrap();

        let donations: Vec<Donation> = [("INR", 500), ("INR", 250), ("USD", 20)]
            .into_iter()
            .map(|(currency, amount)| {
                Donation::new(
                    RecordRef::CollectionBox(stale.id),
                    RecordPaymentRequest {
                        amount: Decimal::new(amount, 0),
                        currency: Some(currency.to_string()),
                        method: None,
                        gateway_reference: None,
                        received_at: None,
                    },
                    "INR",
                    now,
                )
                .unwrap()
            })
            .collect();

        let summary = build_summary(&subscriptions, &[stale], &donations, 4, 2, now);

        assert_eq!(summary.subscriptions.get("paid"), Some(&1));
        assert_eq!(summary.subscriptions.get("pending"), Some(&1));
        assert_eq!(summary.subscriptions.get("overdue"), Some(&1));
        assert_eq!(summary.subscriptions.get("invalid"), Some(&1));
        assert_eq!(summary.cancelled_subscriptions, 1);
        assert_eq!(summary.boxes.get("overdue"), Some(&1));
        assert_eq!(summary.collected.get("INR"), Some(&Decimal::new(750, 0)));
        assert_eq!(summary.collected.get("USD"), Some(&Decimal::new(20, 0)));
        assert_eq!(summary.donors, 4);
    }
}
