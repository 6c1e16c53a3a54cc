use actix_web::{post, web, HttpRequest, HttpResponse};
use actix_web::web::Data;
use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    common::{ApiResponse, RecordRef},
    donation::Donation,
};
use crate::services::{
    database::DatabaseService,
    gateway::{GatewayService, SIGNATURE_HEADER},
};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub event: String,
    pub recorded: bool,
    pub donation: Option<Donation>,
}

/// Gateway callback for captured payments. Always acknowledges a correctly
/// signed event so the gateway stops retrying, even when nothing is recorded.
#[post("/webhook")]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    db: Data<DatabaseService>,
    gateway: Data<GatewayService>,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if signature.is_empty() || !gateway.validate_webhook_signature(&body, signature) {
        log::warn!("Rejected payment webhook with missing or invalid signature");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let webhook = gateway.parse_webhook(&body)?;
    let event = webhook.event.clone();

    let Some((target, request)) = gateway.captured_payment(webhook) else {
        log::debug!("Ignoring gateway event {}", event);
        return Ok(ack(event, None, "Event ignored"));
    };

    if let Some(reference) = request.gateway_reference.as_deref() {
        if db.find_donation_by_reference(reference)?.is_some() {
            log::info!("Gateway payment {} already recorded", reference);
            return Ok(ack(event, None, "Payment already recorded"));
        }
    }

    let recorded = Donation::new(target, request, gateway.currency(), Utc::now()).and_then(|donation| {
        match target {
            RecordRef::Subscription(id) => db.record_subscription_payment(&id, donation).map(|(d, _)| d),
            RecordRef::CollectionBox(id) => db.record_box_collection(&id, donation).map(|(d, _)| d),
        }
    });

    match recorded {
        Ok(donation) => Ok(ack(event, Some(donation), "Payment recorded")),
        // Retrying cannot fix these; a concurrent duplicate delivery also lands here.
        Err(err @ (AppError::NotFound(_) | AppError::Conflict(_) | AppError::Validation(_))) => {
            log::warn!("Captured payment for {} not recorded: {}", target, err);
            Ok(ack(event, None, "Payment not recorded"))
        }
        Err(err) => Err(err),
    }
}

fn ack(event: String, donation: Option<Donation>, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success_with_message(
        WebhookAck {
            event,
            recorded: donation.is_some(),
            donation,
        },
        message.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use crate::handlers::test_support::{init_app, state, WEBHOOK_SECRET};
    use crate::models::{
        donor::CreateDonorRequest,
        subscription::CreateSubscriptionRequest,
    };
    use crate::services::gateway::{sign, SIGNATURE_HEADER};
    use crate::status::{summarize, PaymentStatus};

    #[actix_web::test]
    async fn test_captured_payment_is_recorded_once() {
        let state = state();
        let app = init_app!(state);

        let donor = state
            .db
            .create_donor(CreateDonorRequest {
                name: "Farah Khan".to_string(),
                phone: "9876500001".to_string(),
                email: None,
            })
            .unwrap();
        let subscription = state
            .db
            .create_subscription(
                CreateSubscriptionRequest {
                    donor_id: donor.id,
                    amount: Decimal::new(750, 0),
                    currency: None,
                    period: "monthly".to_string(),
                },
                "INR",
            )
            .unwrap();

        let body = json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_Webhook001",
                "amount": 75_000,
                "currency": "INR",
                "method": "card",
                "created_at": Utc::now().timestamp(),
                "notes": {"subscription_id": subscription.id}
            }}}
        })
        .to_string();
        let signature = sign(WEBHOOK_SECRET, body.as_bytes());

        for expected in [true, false] {
            let req = test::TestRequest::post()
                .uri("/api/v1/payments/webhook")
                .insert_header((SIGNATURE_HEADER, signature.clone()))
                .set_payload(body.clone())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let ack: Value = test::read_body_json(resp).await;
            assert_eq!(ack["data"]["recorded"], expected);
        }

        let stored = state.db.get_subscription(&subscription.id).unwrap();
        assert_eq!(
            summarize(&stored, Utc::now()).unwrap().payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(state.db.list_donations(None).unwrap().len(), 1);
        assert_eq!(state.db.list_donations(None).unwrap()[0].amount, Decimal::new(750, 0));
    }

    fn captured_event(reference: &str, amount: i64, notes: Value) -> String {
        json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": reference,
                "amount": amount,
                "currency": "INR",
                "method": "upi",
                "created_at": Utc::now().timestamp(),
                "notes": notes
            }}}
        })
        .to_string()
    }

    fn signed(body: String) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/payments/webhook")
            .insert_header((SIGNATURE_HEADER, sign(WEBHOOK_SECRET, body.as_bytes())))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_unknown_record_is_acknowledged() {
        let state = state();
        let app = init_app!(state);

        let body = captured_event(
            "pay_Unknown001",
            10_000,
            json!({"subscription_id": uuid::Uuid::new_v4()}),
        );
        let resp = test::call_service(&app, signed(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let ack: Value = test::read_body_json(resp).await;
        assert_eq!(ack["data"]["recorded"], false);
        assert_eq!(ack["message"], "Payment not recorded");
        assert!(state.db.list_donations(None).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_cancelled_subscription_and_zero_amount_are_acknowledged() {
        let state = state();
        let app = init_app!(state);

        let donor = state
            .db
            .create_donor(CreateDonorRequest {
                name: "Imran Sheikh".to_string(),
                phone: "9876500002".to_string(),
                email: None,
            })
            .unwrap();
        let subscription = state
            .db
            .create_subscription(
                CreateSubscriptionRequest {
                    donor_id: donor.id,
                    amount: Decimal::new(200, 0),
                    currency: None,
                    period: "weekly".to_string(),
                },
                "INR",
            )
            .unwrap();

        let req = signed(captured_event("pay_Zero001", 0, json!({"subscription_id": subscription.id})));
        let ack: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(ack["data"]["recorded"], false);

        state.db.cancel_subscription(&subscription.id).unwrap();
        let req = signed(captured_event("pay_Late001", 20_000, json!({"subscription_id": subscription.id})));
        let ack: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(ack["data"]["recorded"], false);
        assert!(state.db.list_donations(None).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_bad_signature_rejected() {
        let state = state();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/payments/webhook")
            .insert_header((SIGNATURE_HEADER, "deadbeef"))
            .set_payload(r#"{"event":"payment.captured"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/payments/webhook")
            .set_payload(r#"{"event":"payment.captured"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_unrelated_event_acknowledged() {
        let state = state();
        let app = init_app!(state);
        let body = r#"{"event":"refund.created","payload":{}}"#;

        let req = test::TestRequest::post()
            .uri("/api/v1/payments/webhook")
            .insert_header((SIGNATURE_HEADER, sign(WEBHOOK_SECRET, body.as_bytes())))
            .set_payload(body)
            .to_request();
        let ack: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ack["data"]["recorded"], false);
        assert_eq!(ack["message"], "Event ignored");
    }
}
