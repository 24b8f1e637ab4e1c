use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use khqr_engine::{
    db_types::{NewPaymentRequest, PaymentStatus},
    events::EventProducers,
    khqr::{correlation_hash, KhqrError},
    payment_objects::{NewPaymentRequestParams, PaymentReference, WebhookNotification},
    traits::{PaymentRequestStore, PaymentStoreError, QrRenderer, RenderError},
    MerchantProfile,
    PaymentFlowApi,
    PaymentFlowError,
    ReconciliationConfig,
    SqliteDatabase,
};
use kpg_common::{Amount, Currency};
use support::{
    prepare_env::{prepare_test_env, random_db_path, tear_down},
    verifier::ScriptedVerifier,
};

mod support;

fn profile() -> MerchantProfile {
    MerchantProfile {
        provider_id: "KHQR".into(),
        payee_account: "coffee@bank".into(),
        payee_display_name: "Coffee Corner".into(),
        merchant_city: "Phnom Penh".into(),
        store_label: "Main Street".into(),
        terminal_label: "POS-01".into(),
    }
}

fn draft(bill_reference: &str, payload: &str) -> NewPaymentRequest {
    NewPaymentRequest {
        correlation_hash: correlation_hash(payload),
        bill_reference: bill_reference.into(),
        payload: payload.into(),
        rendered_code_ref: None,
        amount: Amount::from_minor_units(1250),
        currency: Currency::Usd,
        requester_user_id: None,
    }
}

/// Remembers the bill reference of every code it renders.
#[derive(Clone, Default)]
struct RecordingRenderer {
    rendered: Arc<Mutex<Vec<String>>>,
}

impl QrRenderer for RecordingRenderer {
    fn render(&self, _payload: &str, bill_reference: &str, _hash: &str) -> Result<String, RenderError> {
        self.rendered.lock().unwrap().push(bill_reference.to_string());
        Ok(format!("codes/{bill_reference}.svg"))
    }
}

struct FailingRenderer;

impl QrRenderer for FailingRenderer {
    fn render(&self, _payload: &str, _bill_reference: &str, _hash: &str) -> Result<String, RenderError> {
        Err(RenderError::StorageFailed("disk full".into()))
    }
}

async fn count_rows(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payment_requests").fetch_one(db.pool()).await.unwrap()
}

#[tokio::test]
async fn create_and_fetch() {
    let db = prepare_test_env(&random_db_path()).await;
    let request = db.create_payment_request(draft("TRX1001", "payload-1")).await.unwrap();
    assert_eq!(request.status, PaymentStatus::Pending);
    assert!(request.linked_order_id.is_none());
    assert_eq!(request.amount, Amount::from_minor_units(1250));

    let by_hash = db.fetch_payment_request_by_hash(&request.correlation_hash).await.unwrap().unwrap();
    let by_ref = db.fetch_payment_request_by_bill_reference("TRX1001").await.unwrap().unwrap();
    let by_id = db.fetch_payment_request(request.id).await.unwrap().unwrap();
    assert_eq!(by_hash, request);
    assert_eq!(by_ref, request);
    assert_eq!(by_id, request);
    assert!(db.fetch_payment_request_by_hash("nope").await.unwrap().is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn duplicates_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    db.create_payment_request(draft("TRX1001", "payload-1")).await.unwrap();
    let err = db.create_payment_request(draft("TRX1001", "payload-2")).await.unwrap_err();
    assert!(matches!(err, PaymentStoreError::DuplicateBillReference(r) if r == "TRX1001"));
    let err = db.create_payment_request(draft("TRX1002", "payload-1")).await.unwrap_err();
    assert!(matches!(err, PaymentStoreError::DuplicateCorrelationHash(_)));
    assert_eq!(count_rows(&db).await, 1);
    tear_down(db).await;
}

#[tokio::test]
async fn status_and_link_change_at_most_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let request = db.create_payment_request(draft("TRX1001", "payload-1")).await.unwrap();
    assert!(db.mark_paid(request.id, Some("txn-1")).await.unwrap());
    assert!(!db.mark_paid(request.id, Some("txn-2")).await.unwrap());
    let paid = db.fetch_payment_request(request.id).await.unwrap().unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.external_transaction_id.as_deref(), Some("txn-1"));

    // link_order needs a real order row
    sqlx::query("INSERT INTO customers (name, is_guest, created_at) VALUES ('c', 0, $1)")
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
    for _ in 0..2 {
        sqlx::query(
            "INSERT INTO orders (customer_id, total_price, currency, payment_method, created_at, updated_at) VALUES (1, \
             1250, 'USD', 'KHQR', $1, $1)",
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
    }
    assert!(db.link_order(request.id, 1).await.unwrap());
    assert!(!db.link_order(request.id, 2).await.unwrap());
    let linked = db.fetch_payment_request(request.id).await.unwrap().unwrap();
    assert_eq!(linked.linked_order_id, Some(1));
    tear_down(db).await;
}

#[tokio::test]
async fn mark_paid_on_missing_request_is_false() {
    let db = prepare_test_env(&random_db_path()).await;
    assert!(!db.mark_paid(42, None).await.unwrap());
    tear_down(db).await;
}

#[tokio::test]
async fn purge_only_touches_old_pending_requests() {
    let db = prepare_test_env(&random_db_path()).await;
    let stale = db.create_payment_request(draft("TRX-OLD", "payload-old")).await.unwrap();
    let paid = db.create_payment_request(draft("TRX-PAID", "payload-paid")).await.unwrap();
    db.mark_paid(paid.id, None).await.unwrap();
    let old = Utc::now() - Duration::hours(2);
    sqlx::query("UPDATE payment_requests SET created_at = $1").bind(old).execute(db.pool()).await.unwrap();
    let fresh = db.create_payment_request(draft("TRX-NEW", "payload-new")).await.unwrap();

    let purged = db.purge_stale(Utc::now() - Duration::hours(1), true).await.unwrap();
    assert_eq!(purged.len(), 1);
    assert_eq!(purged[0].id, stale.id);
    assert!(db.fetch_payment_request_by_hash(&stale.correlation_hash).await.unwrap().is_none());
    assert!(db.fetch_payment_request(paid.id).await.unwrap().is_some());
    assert!(db.fetch_payment_request(fresh.id).await.unwrap().is_some());

    // The bill reference is free again once the old request is gone
    let recreated = db.create_payment_request(draft("TRX-OLD", "payload-old-2")).await.unwrap();
    assert_ne!(recreated.id, stale.id);
    tear_down(db).await;
}

#[tokio::test]
async fn purged_request_reads_as_unknown() {
    let db = prepare_test_env(&random_db_path()).await;
    let verifier = ScriptedVerifier::default();
    let config = ReconciliationConfig { pending_request_ttl: Duration::minutes(10), ..Default::default() };
    let api = PaymentFlowApi::new(db.clone(), verifier, profile(), config.clone(), EventProducers::default());
    let params = NewPaymentRequestParams::new("5.00".parse().unwrap(), Currency::Usd).with_bill_reference("TRX2001");
    let request = api.generate_payment_request(params).await.unwrap();
    sqlx::query("UPDATE payment_requests SET created_at = $1")
        .bind(Utc::now() - Duration::minutes(11))
        .execute(db.pool())
        .await
        .unwrap();

    let purged = api.purge_stale_requests(config.pending_request_ttl).await.unwrap();
    assert_eq!(purged.len(), 1);
    assert!(db.fetch_payment_request_by_hash(&request.correlation_hash).await.unwrap().is_none());

    let webhook = WebhookNotification {
        reference: PaymentReference::BillReference("TRX2001".into()),
        status: "SUCCESS".into(),
        external_txn_id: Some("txn-late".into()),
    };
    let err = api.process_webhook(webhook).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::UnknownPaymentRequest(_)));
    let err = api.check_payment(&request.correlation_hash).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::UnknownPaymentRequest(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn malformed_requests_persist_nothing() {
    let db = prepare_test_env(&random_db_path()).await;
    // An amount string like "KHR 10000" never gets past the payload builder
    let err = khqr_engine::khqr::PayloadBuilder::new("KHQR")
        .build(&khqr_engine::khqr::PayloadRequest {
            payee_account: "coffee@bank".into(),
            payee_display_name: "Coffee Corner".into(),
            merchant_city: "Phnom Penh".into(),
            amount: "KHR 10000".into(),
            currency: Currency::Khr,
            store_label: "Main Street".into(),
            bill_reference: "TRX3001".into(),
            terminal_label: "POS-01".into(),
        })
        .unwrap_err();
    assert!(matches!(err, KhqrError::InvalidAmount(_)));

    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        profile(),
        ReconciliationConfig::default(),
        EventProducers::default(),
    );
    let params = NewPaymentRequestParams::new(Amount::from_minor_units(100), Currency::Khr).with_bill_reference("bad ref");
    let err = api.generate_payment_request(params).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::InvalidBillReference(_)));

    let long_name = MerchantProfile { payee_account: "a".repeat(120), ..profile() };
    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        long_name,
        ReconciliationConfig::default(),
        EventProducers::default(),
    );
    let params = NewPaymentRequestParams::new(Amount::from_minor_units(100), Currency::Khr);
    let err = api.generate_payment_request(params).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::InvalidPayload(KhqrError::FieldTooLong { .. })));

    assert_eq!(count_rows(&db).await, 0);
    tear_down(db).await;
}

#[tokio::test]
async fn generated_requests_are_pending_with_valid_payloads() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        profile(),
        ReconciliationConfig::default(),
        EventProducers::default(),
    );
    let params = NewPaymentRequestParams::new("0.03".parse().unwrap(), Currency::Usd).with_bill_reference("TRX1001");
    let request = api.generate_payment_request(params).await.unwrap();
    assert_eq!(request.status, PaymentStatus::Pending);
    assert!(request.payload.contains("5303840"));
    assert!(request.payload.contains("54040.03"));
    assert!(khqr_engine::khqr::verify_crc(&request.payload));
    assert_eq!(request.correlation_hash, correlation_hash(&request.payload));

    let auto = api.generate_payment_request(NewPaymentRequestParams::new("1".parse().unwrap(), Currency::Khr)).await.unwrap();
    assert!(auto.bill_reference.starts_with("TRX"));
    assert!(auto.payload.contains("54041.00"));

    let dup = NewPaymentRequestParams::new("9.99".parse().unwrap(), Currency::Usd).with_bill_reference("TRX1001");
    let err = api.generate_payment_request(dup).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::DuplicateBillReference(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn codes_are_rendered_for_stored_requests_only() {
    let db = prepare_test_env(&random_db_path()).await;
    let renderer = RecordingRenderer::default();
    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        profile(),
        ReconciliationConfig::default(),
        EventProducers::default(),
    )
    .with_renderer(renderer.clone());
    let params = NewPaymentRequestParams::new("1.50".parse().unwrap(), Currency::Usd).with_bill_reference("TRX1");
    let request = api.generate_payment_request(params).await.unwrap();
    assert_eq!(request.rendered_code_ref.as_deref(), Some("codes/TRX1.svg"));
    let stored = db.fetch_payment_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.rendered_code_ref.as_deref(), Some("codes/TRX1.svg"));

    let again = NewPaymentRequestParams::new("2.00".parse().unwrap(), Currency::Usd).with_bill_reference("TRX1");
    let err = api.generate_payment_request(again).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::DuplicateBillReference(_)));
    assert_eq!(*renderer.rendered.lock().unwrap(), vec!["TRX1".to_string()]);
    tear_down(db).await;
}

#[tokio::test]
async fn rendering_failures_still_create_the_request() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        profile(),
        ReconciliationConfig::default(),
        EventProducers::default(),
    )
    .with_renderer(FailingRenderer);
    let params = NewPaymentRequestParams::new("1.50".parse().unwrap(), Currency::Usd).with_bill_reference("TRX2");
    let request = api.generate_payment_request(params).await.unwrap();
    assert!(request.rendered_code_ref.is_none());
    assert_eq!(count_rows(&db).await, 1);
    tear_down(db).await;
}

#[tokio::test]
async fn non_positive_ttl_purges_nothing() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = PaymentFlowApi::new(
        db.clone(),
        ScriptedVerifier::default(),
        profile(),
        ReconciliationConfig::default(),
        EventProducers::default(),
    );
    let params = NewPaymentRequestParams::new("5.00".parse().unwrap(), Currency::Usd).with_bill_reference("TRX4001");
    let request = api.generate_payment_request(params).await.unwrap();
    for ttl in [Duration::minutes(-5), Duration::zero()] {
        assert!(api.purge_stale_requests(ttl).await.unwrap().is_empty());
    }
    assert!(db.fetch_payment_request_by_hash(&request.correlation_hash).await.unwrap().is_some());
    tear_down(db).await;
}
