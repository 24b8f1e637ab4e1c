use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use khqr_engine::traits::{PaymentRequestStore, VerificationError, VerificationOutcome};
use mockall::predicate::eq;
use serde_json::Value;

use super::{
    helpers::{api_over, new_api, open_webhooks, post_request, test_api, TestApi},
    mocks::MockVerifier,
};
use crate::{
    config::ServerOptions,
    data_objects::GeneratedPayment,
    integrations::renderer::SvgFileRenderer,
    routes::health,
};

async fn generate(api: &TestApi, body: &str) -> (StatusCode, String) {
    post_request(api, open_webhooks(), "/payments/generate", body, &[]).await
}

#[actix_web::test]
async fn health_check() {
    let (_db, api) = test_api(MockVerifier::new()).await;
    let options = ServerOptions { use_x_forwarded_for: false, use_forwarded: false, whitelist: None };
    let app = App::new().app_data(api).app_data(web::Data::new(options)).service(health);
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn generate_payment_request() {
    let (db, api) = test_api(MockVerifier::new()).await;
    let (status, body) = generate(&api, r#"{"amount": "0.03", "currency": "USD", "bill_reference": "TRX1001"}"#).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let generated: GeneratedPayment = serde_json::from_str(&body).unwrap();
    assert_eq!(generated.bill_reference, "TRX1001");
    assert!(generated.payload.contains("54040.03"));
    assert!(generated.rendered_code_ref.is_none());
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["amount"], "0.03");
    let stored = db.fetch_payment_request_by_hash(&generated.correlation_hash).await.unwrap().unwrap();
    assert_eq!(stored.bill_reference, "TRX1001");
}

#[actix_web::test]
async fn generate_without_bill_reference() {
    let (_db, api) = test_api(MockVerifier::new()).await;
    let (status, body) = generate(&api, r#"{"amount": 15000, "currency": "KHR", "bill_reference": ""}"#).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let generated: GeneratedPayment = serde_json::from_str(&body).unwrap();
    assert!(!generated.bill_reference.is_empty());
}

#[actix_web::test]
async fn malformed_generate_requests() {
    let (db, api) = test_api(MockVerifier::new()).await;
    let (status, body) = generate(&api, r#"{"amount": "KHR 10000", "currency": "KHR", "bill_reference": "TRX9"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"), "{body}");
    assert!(db.fetch_payment_request_by_bill_reference("TRX9").await.unwrap().is_none());

    let (status, _) = generate(&api, r#"{"amount": "1.00", "currency": "USD", "bill_reference": "not valid!"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = generate(&api, r#"{"amount": "1.00", "currency": "EUR"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = generate(&api, "this is not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn duplicate_bill_reference_is_a_conflict() {
    let (_db, api) = test_api(MockVerifier::new()).await;
    let body = r#"{"amount": "2.50", "currency": "USD", "bill_reference": "TRX1001"}"#;
    let (status, _) = generate(&api, body).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = generate(&api, body).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[actix_web::test]
async fn check_unknown_payment() {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().never();
    let (_db, api) = test_api(verifier).await;
    let (status, body) =
        post_request(&api, open_webhooks(), "/payments/check", r#"{"correlation_hash": "deadbeef"}"#, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[actix_web::test]
async fn check_pending_then_paid() {
    let (db, api) = test_api(MockVerifier::new()).await;
    let (_, body) = generate(&api, r#"{"amount": "4.20", "currency": "USD", "bill_reference": "TRX2001"}"#).await;
    let generated: GeneratedPayment = serde_json::from_str(&body).unwrap();
    let check = format!(r#"{{"correlation_hash": "{}"}}"#, generated.correlation_hash);

    // Scripted verifier over the same database
    let mut verifier = MockVerifier::new();
    let mut seq = mockall::Sequence::new();
    verifier
        .expect_verify()
        .with(eq(generated.correlation_hash.clone()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(VerificationOutcome::NotYet));
    verifier
        .expect_verify()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(VerificationError::ExternalApiUnavailable("connection refused".into())));
    verifier
        .expect_verify()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(VerificationOutcome::Confirmed { external_txn_id: Some("txn-777".into()) }));
    let api = api_over(db.clone(), verifier);

    for _ in 0..2 {
        let (status, body) = post_request(&api, open_webhooks(), "/payments/check", &check, &[]).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert!(json.get("order_id").is_none());
    }

    let (status, body) = post_request(&api, open_webhooks(), "/payments/check", &check, &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PAID");
    assert_eq!(json["bill_reference"], "TRX2001");
    assert_eq!(json["external_txn_id"], "txn-777");
    assert!(json["order_id"].as_i64().is_some());

    // Settled requests are answered from the store
    let (status, body) = post_request(&api, open_webhooks(), "/payments/check", &check, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let again: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(again["order_id"], json["order_id"]);
}

#[actix_web::test]
async fn rejected_requests_leave_no_codes_behind() {
    let (db, _) = test_api(MockVerifier::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let api = web::Data::new(new_api(db, MockVerifier::new()).with_renderer(SvgFileRenderer::new(dir.path())));
    let (status, body) = generate(&api, r#"{"amount": "1.00", "currency": "USD", "bill_reference": "TRX1"}"#).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let generated: GeneratedPayment = serde_json::from_str(&body).unwrap();
    let code = generated.rendered_code_ref.expect("a rendered code");
    assert!(std::path::Path::new(&code).exists());

    let (status, _) = generate(&api, r#"{"amount": "2.00", "currency": "USD", "bill_reference": "TRX1"}"#).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
