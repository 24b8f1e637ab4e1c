use std::time::Duration;

use actix_web::{
    dev::{HttpServiceFactory, Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, Either};
use khqr_engine::{traits::PaymentVerifier, PaymentFlowApi, SqliteDatabase};
use khqr_provider::ProviderApi;
use log::*;

use crate::{
    config::{ServerConfig, ServerOptions, WebhookConfig, WEBHOOK_HMAC_HEADER},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{notifications::create_event_handlers, provider::ProviderVerifier, renderer::SvgFileRenderer},
    janitor::start_janitor,
    middleware::HmacMiddlewareFactory,
    routes::{health, CheckPaymentRoute, GeneratePaymentRoute, PaymentWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    info!("🗃️ Database ready at {}", config.database_url);
    let handlers = create_event_handlers(config.notify_url.clone());
    let producers = handlers.producers();
    handlers.start_handlers();
    let provider = ProviderApi::new(config.provider.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = ProviderVerifier::new(provider);
    let mut api =
        PaymentFlowApi::new(db, verifier, config.merchant.clone(), config.reconciliation.clone(), producers);
    if let Some(dir) = &config.qr_output_dir {
        info!("🖼️ QR codes will be written to {}", dir.display());
        api = api.with_renderer(SvgFileRenderer::new(dir));
    }
    let _janitor = start_janitor(api.clone(), config.reconciliation.pending_request_ttl, config.janitor_interval);
    let srv = create_server_instance(config, api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<V>(
    config: ServerConfig,
    api: PaymentFlowApi<SqliteDatabase, V>,
) -> Result<Server, ServerError>
where
    V: PaymentVerifier + Clone + Send + 'static,
{
    let options = ServerOptions::from_config(&config);
    let webhook_config = config.webhook.clone();
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kpg::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(api.clone()))
            .app_data(web::Data::new(options.clone()))
            .service(health)
            .service(payment_routes::<V>(&options, &webhook_config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The `/payments` scope. Webhooks sit in their own scope behind the provider IP whitelist and the signature check.
pub fn payment_routes<V>(options: &ServerOptions, webhook: &WebhookConfig) -> impl HttpServiceFactory
where V: PaymentVerifier + 'static {
    let use_x_forwarded_for = options.use_x_forwarded_for;
    let use_forwarded = options.use_forwarded;
    let whitelist = options.whitelist.clone();
    let hmac = HmacMiddlewareFactory::new(WEBHOOK_HMAC_HEADER, webhook.hmac_secret.clone(), webhook.hmac_checks);
    let webhook_scope = web::scope("/webhook")
        .wrap(hmac)
        .wrap_fn(move |req, srv| {
            let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
            let whitelisted = match (peer_ip, &whitelist) {
                (Some(ip), Some(whitelist)) => {
                    info!("💻️ Payment webhook from {ip}");
                    whitelist.contains(&ip)
                },
                (_, None) => true,
                (None, Some(_)) => {
                    warn!("💻️ No IP address found in webhook request, denying access.");
                    false
                },
            };
            if whitelisted {
                Either::Left(srv.call(req))
            } else {
                warn!("💻️ Webhook from {peer_ip:?} is not on the provider whitelist. Denying access.");
                Either::Right(ok(req.error_response(ServerError::ForbiddenPeer)))
            }
        })
        .service(PaymentWebhookRoute::<SqliteDatabase, V>::new());
    web::scope("/payments")
        .service(GeneratePaymentRoute::<SqliteDatabase, V>::new())
        .service(CheckPaymentRoute::<SqliteDatabase, V>::new())
        .service(webhook_scope)
}

/// Malformed JSON bodies get the same `{"error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Rejecting request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}
