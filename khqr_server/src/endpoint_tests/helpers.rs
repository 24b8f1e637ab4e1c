use std::net::IpAddr;

use actix_web::{
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use khqr_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    MerchantProfile,
    PaymentFlowApi,
    ReconciliationConfig,
    SqliteDatabase,
};
use log::debug;

use crate::{
    config::{ServerOptions, WebhookConfig},
    endpoint_tests::mocks::MockVerifier,
    routes::health,
    server::{json_config, payment_routes},
};

pub type TestApi = web::Data<PaymentFlowApi<SqliteDatabase, MockVerifier>>;

pub fn profile() -> MerchantProfile {
    MerchantProfile {
        provider_id: "KHQR".into(),
        payee_account: "coffee@bank".into(),
        payee_display_name: "Coffee Corner".into(),
        merchant_city: "Phnom Penh".into(),
        store_label: "Main Street".into(),
        terminal_label: "POS-01".into(),
    }
}

pub async fn test_api(verifier: MockVerifier) -> (SqliteDatabase, TestApi) {
    let _ = env_logger::try_init();
    let db = prepare_test_env(&random_db_path()).await;
    let api = api_over(db.clone(), verifier);
    (db, api)
}

pub fn api_over(db: SqliteDatabase, verifier: MockVerifier) -> TestApi {
    web::Data::new(new_api(db, verifier))
}

pub fn new_api(db: SqliteDatabase, verifier: MockVerifier) -> PaymentFlowApi<SqliteDatabase, MockVerifier> {
    PaymentFlowApi::new(db, verifier, profile(), ReconciliationConfig::default(), EventProducers::default())
}

/// Webhook checks off, no whitelist.
pub fn open_webhooks() -> WebhookConfig {
    WebhookConfig { hmac_checks: false, ..Default::default() }
}

pub async fn post_request(
    api: &TestApi,
    webhook: WebhookConfig,
    path: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let options = ServerOptions { use_x_forwarded_for: true, use_forwarded: false, whitelist: webhook.whitelist.clone() };
    let app = App::new()
        .app_data(json_config())
        .app_data(api.clone())
        .app_data(web::Data::new(options.clone()))
        .service(health)
        .service(payment_routes::<MockVerifier>(&options, &webhook));
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri(path).insert_header(ContentType::json()).set_payload(body.to_string());
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    debug!("Making request to {path}");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
