use actix_web::http::StatusCode;
use khqr_engine::traits::PaymentRequestStore;
use kpg_common::Secret;
use serde_json::Value;

use super::{
    helpers::{ip, open_webhooks, post_request, test_api, TestApi},
    mocks::MockVerifier,
};
use crate::{config::WebhookConfig, data_objects::GeneratedPayment, helpers::calculate_hmac};

const WEBHOOK: &str = "/payments/webhook";

async fn new_request(api: &TestApi, bill_reference: &str) -> GeneratedPayment {
    let body = format!(r#"{{"amount": "3.00", "currency": "USD", "bill_reference": "{bill_reference}"}}"#);
    let (status, body) = post_request(api, open_webhooks(), "/payments/generate", &body, &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

fn signed_webhooks() -> WebhookConfig {
    WebhookConfig { hmac_secret: Secret::new("shared-secret".to_string()), hmac_checks: true, whitelist: None }
}

fn no_provider_calls() -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().never();
    verifier
}

#[actix_web::test]
async fn webhook_without_reference() {
    let (_db, api) = test_api(no_provider_calls()).await;
    let (status, body) = post_request(&api, open_webhooks(), WEBHOOK, r#"{"status": "SUCCESS"}"#, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[actix_web::test]
async fn webhook_for_unknown_request() {
    let (_db, api) = test_api(no_provider_calls()).await;
    let body = r#"{"bill_reference": "TRX404", "status": "SUCCESS"}"#;
    let (status, body) = post_request(&api, open_webhooks(), WEBHOOK, body, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[actix_web::test]
async fn successful_webhook_marks_request_paid() {
    let (db, api) = test_api(no_provider_calls()).await;
    let generated = new_request(&api, "TRX3001").await;
    let body = r#"{"bill_reference": "TRX3001", "status": "success", "external_txn_id": "txn-42"}"#;
    let (status, body) = post_request(&api, open_webhooks(), WEBHOOK, body, &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PAID");
    assert_eq!(json["external_txn_id"], "txn-42");
    let order_id = json["order_id"].as_i64().unwrap();

    let stored = db.fetch_payment_request_by_hash(&generated.correlation_hash).await.unwrap().unwrap();
    assert_eq!(stored.linked_order_id, Some(order_id));

    // Redelivery is answered with the same order
    let body = format!(r#"{{"correlation_hash": "{}", "status": "SUCCESS"}}"#, generated.correlation_hash);
    let (status, body) = post_request(&api, open_webhooks(), WEBHOOK, &body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order_id"].as_i64(), Some(order_id));
}

#[actix_web::test]
async fn failed_payment_webhook_is_acknowledged() {
    let (_db, api) = test_api(no_provider_calls()).await;
    new_request(&api, "TRX3002").await;
    let body = r#"{"bill_reference": "TRX3002", "status": "FAILED"}"#;
    let (status, body) = post_request(&api, open_webhooks(), WEBHOOK, body, &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert!(json.get("order_id").is_none());
}

#[actix_web::test]
async fn webhook_signatures() {
    let (_db, api) = test_api(no_provider_calls()).await;
    new_request(&api, "TRX3003").await;
    let body = r#"{"bill_reference": "TRX3003", "status": "SUCCESS"}"#;

    let (status, _) = post_request(&api, signed_webhooks(), WEBHOOK, body, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let bad = calculate_hmac("wrong-secret", body.as_bytes());
    let (status, _) = post_request(&api, signed_webhooks(), WEBHOOK, body, &[("X-KHQR-Signature", bad.as_str())]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_request(&api, signed_webhooks(), WEBHOOK, body, &[("X-KHQR-Signature", "%%%")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let good = calculate_hmac("shared-secret", body.as_bytes());
    let (status, body) = post_request(&api, signed_webhooks(), WEBHOOK, body, &[("X-KHQR-Signature", good.as_str())]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PAID");
}

#[actix_web::test]
async fn signatures_without_a_secret_are_denied() {
    let (_db, api) = test_api(no_provider_calls()).await;
    new_request(&api, "TRX3004").await;
    let body = r#"{"bill_reference": "TRX3004", "status": "SUCCESS"}"#;
    let config = WebhookConfig { hmac_checks: true, ..Default::default() };
    let sig = calculate_hmac("", body.as_bytes());
    let (status, _) = post_request(&api, config, WEBHOOK, body, &[("X-KHQR-Signature", sig.as_str())]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn provider_whitelist() {
    let (_db, api) = test_api(no_provider_calls()).await;
    new_request(&api, "TRX3005").await;
    let body = r#"{"bill_reference": "TRX3005", "status": "SUCCESS"}"#;
    let config = WebhookConfig { whitelist: Some(vec![ip("10.0.0.7")]), ..open_webhooks() };

    let (status, body_out) = post_request(&api, config.clone(), WEBHOOK, body, &[("X-Forwarded-For", "192.168.1.1")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body_out}");

    let (status, body_out) = post_request(&api, config, WEBHOOK, body, &[("X-Forwarded-For", "10.0.0.7")]).await;
    assert_eq!(status, StatusCode::OK, "{body_out}");
}
