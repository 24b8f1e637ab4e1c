//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database or the payment provider, so
//! they are all async.
//!
//! The payment routes are mounted under `/payments` by [`crate::server::payment_routes`], which is why their paths are
//! relative here.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use khqr_engine::{
    payment_objects::{ReconciliationOutcome, WebhookNotification},
    traits::{PaymentGatewayDatabase, PaymentVerifier},
    PaymentFlowApi,
};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{CheckPaymentParams, GeneratePaymentParams, GeneratedPayment, PaymentStatusResponse, WebhookPayload},
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Payment requests  ---------------------------------------------
route!(generate_payment => Post "/generate" impl PaymentGatewayDatabase, PaymentVerifier);
pub async fn generate_payment<B, V>(
    api: web::Data<PaymentFlowApi<B, V>>,
    body: web::Json<GeneratePaymentParams>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    V: PaymentVerifier,
{
    let params = body.into_inner();
    debug!("💻️ New payment request for {} {}", params.amount, params.currency);
    let request = api.generate_payment_request(params.into()).await.map_err(|e| {
        warn!("💻️ Could not generate a payment request. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(GeneratedPayment::from(request)))
}

route!(check_payment => Post "/check" impl PaymentGatewayDatabase, PaymentVerifier);
pub async fn check_payment<B, V>(
    api: web::Data<PaymentFlowApi<B, V>>,
    body: web::Json<CheckPaymentParams>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    V: PaymentVerifier,
{
    let CheckPaymentParams { correlation_hash } = body.into_inner();
    trace!("💻️ Payment check for {correlation_hash}");
    let result = api.check_payment(correlation_hash.trim()).await.map_err(|e| {
        debug!("💻️ Payment check for {correlation_hash} failed. {e}");
        ServerError::from(e)
    })?;
    if let ReconciliationOutcome::Materialized(order) = &result.outcome {
        info!("💻️ Payment check for [{}] settled order #{}", result.payment_request.bill_reference, order.id);
    }
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(result)))
}

//------------------------------------------   Provider webhooks  ---------------------------------------------
route!(payment_webhook => Post "" impl PaymentGatewayDatabase, PaymentVerifier);
pub async fn payment_webhook<B, V>(
    req: HttpRequest,
    options: web::Data<ServerOptions>,
    api: web::Data<PaymentFlowApi<B, V>>,
    body: web::Json<WebhookPayload>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    V: PaymentVerifier,
{
    let peer_addr = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let payload = body.into_inner();
    info!("💻️ Payment webhook received from {peer_addr:?}. Status: {}", payload.status);
    trace!("💻️ Webhook payload: {}", serde_json::to_string(&payload).unwrap_or_else(|e| format!("{e}")));
    let notification = WebhookNotification::try_from(payload)?;
    let result = api.process_webhook(notification).await.map_err(|e| {
        warn!("💻️ Could not process payment webhook. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(result)))
}
