use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;

use crate::config::GatewayConfig;
use crate::errors::AppError;
use crate::models::{
    common::{PaymentMethod, RecordRef},
    donation::{GatewayPayment, GatewayWebhook, RecordPaymentRequest},
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const CAPTURED_EVENT: &str = "payment.captured";

/// Verifies and decodes payment-gateway webhooks. Orders and checkout are
/// handled by the gateway's own hosted pages; this side only learns about
/// captured payments.
#[derive(Clone)]
pub struct GatewayService {
    config: GatewayConfig,
}

impl GatewayService {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Hex HMAC-SHA256 of the raw body, compared in constant time.
    pub fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };

        mac.update(payload);
        mac.verify_slice(&provided).is_ok()
    }

    pub fn parse_webhook(&self, payload: &[u8]) -> Result<GatewayWebhook, AppError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Maps a captured payment onto the record its notes point at. Returns
    /// `None` for other events or payments not tied to a record.
    pub fn captured_payment(&self, webhook: GatewayWebhook) -> Option<(RecordRef, RecordPaymentRequest)> {
        if webhook.event != CAPTURED_EVENT {
            return None;
        }
        let payment = webhook.payload.payment?.entity;

        let target = match (payment.notes.subscription_id, payment.notes.box_id) {
            (Some(id), _) => RecordRef::Subscription(id),
            (None, Some(id)) => RecordRef::CollectionBox(id),
            (None, None) => {
                log::warn!("Captured payment {} carries no record reference", payment.id);
                return None;
            }
        };

        Some((target, to_payment_request(payment)))
    }
}

fn to_payment_request(payment: GatewayPayment) -> RecordPaymentRequest {
    let method = match payment.method.as_deref() {
        Some("upi") => PaymentMethod::Upi,
        Some("card") => PaymentMethod::Card,
        Some("netbanking") | Some("emandate") | Some("nach") => PaymentMethod::BankTransfer,
        _ => PaymentMethod::Online,
    };

    RecordPaymentRequest {
        // minor units, two decimal places (see `GatewayConfig::currency`)
        amount: Decimal::new(payment.amount, 2),
        currency: Some(payment.currency),
        method: Some(method),
        gateway_reference: Some(payment.id),
        received_at: payment
            .created_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn create_test_service() -> GatewayService {
        GatewayService::new(GatewayConfig {
            webhook_secret: "test_webhook_secret".to_string(),
            currency: "INR".to_string(),
        })
    }

    #[test]
    fn test_webhook_signature_validation() {
        let service = create_test_service();
        let payload = b"{\"event\":\"payment.captured\"}";
        let valid_signature = sign("test_webhook_secret", payload);

        assert!(service.validate_webhook_signature(payload, &valid_signature));
        assert!(!service.validate_webhook_signature(payload, "invalid_signature"));
        assert!(!service.validate_webhook_signature(b"tampered", &valid_signature));
    }

    #[test]
    fn test_captured_payment_mapping() {
        let service = create_test_service();
        let subscription_id = Uuid::new_v4();
        let body = json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_29QQoUBi66xm2f",
                "amount": 50_050,
                "currency": "INR",
                "method": "upi",
                "created_at": 1_767_225_600,
                "notes": {"subscription_id": subscription_id}
            }}}
        });

        let webhook = service.parse_webhook(body.to_string().as_bytes()).unwrap();
        let (target, request) = service.captured_payment(webhook).unwrap();

        assert_eq!(target, RecordRef::Subscription(subscription_id));
        assert_eq!(request.amount, Decimal::new(50_050, 2));
        assert_eq!(request.method, Some(PaymentMethod::Upi));
        assert_eq!(request.gateway_reference.as_deref(), Some("pay_29QQoUBi66xm2f"));
        assert_eq!(
            request.received_at.map(|t| t.to_rfc3339()),
            Some("2026-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_other_events_ignored() {
        let service = create_test_service();
        let webhook = service
            .parse_webhook(br#"{"event":"payment.failed","payload":{}}"#)
            .unwrap();
        assert!(service.captured_payment(webhook).is_none());

        let orphan = json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_1", "amount": 100, "currency": "INR"}}}
        });
        let webhook = service.parse_webhook(orphan.to_string().as_bytes()).unwrap();
        assert!(service.captured_payment(webhook).is_none());
    }
}
