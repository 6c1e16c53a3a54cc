use reqwest::Client;
use serde_json::{json, Value};

use crate::config::MessagingConfig;
use crate::errors::AppError;
use crate::models::{collection_box::CollectionBox, subscription::Subscription};
use crate::status::{PaymentStatus, PaymentSummary};

/// Text messages over a WhatsApp Cloud style API. Runs in dry-run mode
/// (log only) when no credentials are configured.
#[derive(Clone)]
pub struct MessagingService {
    client: Client,
    config: MessagingConfig,
}

impl MessagingService {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.phone_number_id.is_none() || self.config.access_token.is_none()
    }

    pub async fn send_text(&self, to: &str, body: &str) -> Result<(), AppError> {
        let (Some(phone_number_id), Some(access_token)) =
            (&self.config.phone_number_id, &self.config.access_token)
        else {
            log::info!("[dry-run] message to {}: {}", to, body);
            return Ok(());
        };

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to.trim_start_matches('+'),
            "type": "text",
            "text": { "body": body }
        });

        let response = self
            .client
            .post(format!("{}/{}/messages", self.config.api_url, phone_number_id))
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Message send failed ({}): {}",
                status, error_text
            )));
        }

        let sent: Value = response.json().await?;
        log::debug!("Message accepted: {}", sent);
        Ok(())
    }
}

pub fn subscription_reminder(
    organization: &str,
    donor_name: &str,
    subscription: &Subscription,
    summary: &PaymentSummary,
) -> String {
    let due = summary
        .next_due_date
        .map(|d| d.format("%d %b %Y").to_string());

    match (summary.payment_status, due) {
        (PaymentStatus::Paid, Some(due)) => format!(
            "Dear {}, your {} donation of {} {} to {} is due on {}. Thank you for your support!",
            donor_name, subscription.period, subscription.amount, subscription.currency, organization, due
        ),
        (PaymentStatus::Overdue, Some(due)) => format!(
            "Dear {}, your {} donation of {} {} to {} was due on {}. Kindly renew at your convenience.",
            donor_name, subscription.period, subscription.amount, subscription.currency, organization, due
        ),
        (_, Some(due)) => format!(
            "Dear {}, your {} donation of {} {} to {} is due today ({}).",
            donor_name, subscription.period, subscription.amount, subscription.currency, organization, due
        ),
        (_, None) => format!(
            "Dear {}, we have not yet received your first {} donation of {} {} to {}.",
            donor_name, subscription.period, subscription.amount, subscription.currency, organization
        ),
    }
}

pub fn box_collection_reminder(organization: &str, collection_box: &CollectionBox) -> String {
    let last = collection_box
        .last_payment_at
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "{}: box {} at {} ({}) is due for collection. Last collected: {}.",
        organization,
        collection_box.box_number,
        collection_box.holder_name,
        collection_box.location.as_deref().unwrap_or("no location"),
        last
    )
}
