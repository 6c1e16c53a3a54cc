pub mod boxes;
pub mod dashboard;
pub mod donors;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod reminders;
pub mod subscriptions;
pub mod volunteers;

use actix_web::web;
use chrono::{DateTime, Utc};

use crate::status::{enrich, Enriched, PaymentTracked};

/// Mounts every API route; `main` and the handler tests share it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/donors")
                .service(donors::create_donor)
                .service(donors::list_donors)
                .service(donors::get_donor)
                .service(donors::get_donor_subscriptions),
        )
        .service(
            web::scope("/subscriptions")
                .service(subscriptions::create_subscription)
                .service(subscriptions::list_subscriptions)
                .service(subscriptions::get_subscription)
                .service(subscriptions::get_subscription_status)
                .service(subscriptions::cancel_subscription)
                .service(subscriptions::record_payment)
                .service(subscriptions::list_payments),
        )
        .service(
            web::scope("/boxes")
                .service(boxes::create_box)
                .service(boxes::list_boxes)
                .service(boxes::get_box)
                .service(boxes::assign_box)
                .service(boxes::record_collection)
                .service(boxes::list_collections),
        )
        .service(
            web::scope("/volunteers")
                .service(volunteers::create_volunteer)
                .service(volunteers::list_volunteers)
                .service(volunteers::get_volunteer_boxes),
        )
        .service(web::scope("/payments").service(payments::payment_webhook))
        .service(web::scope("/dashboard").service(dashboard::get_dashboard))
        .service(web::scope("/notifications").service(notifications::list_notifications))
        .service(web::scope("/reminders").service(reminders::run_reminders));
}

/// Records with an unparseable period are left out of listings (and logged)
/// so one bad row cannot hide the rest.
pub(crate) fn enrich_all<R: PaymentTracked + Clone>(records: &[R], now: DateTime<Utc>) -> Vec<Enriched<R>> {
    records
        .iter()
        .filter_map(|record| match enrich(record, now) {
            Ok(enriched) => Some(enriched),
            Err(err) => {
                log::warn!("Skipping record in listing: {}", err);
                None
            }
        })
        .collect()
}
