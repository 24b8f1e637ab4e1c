use std::{fs, path::Path};

use chrono::Utc;
use futures::future::BoxFuture;
use khqr_engine::events::{EventHandlers, EventHooks, OrderPaidEvent, PaymentRequestExpiredEvent};
use log::*;
use reqwest::Client;
use serde_json::{json, Value};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// Builds the server's event handlers.
///
/// 1. OrderPaidEvent - The order is logged and, if a notification URL is configured, a JSON summary is POSTed to it.
///    Delivery failures are logged and not retried.
/// 2. PaymentRequestExpiredEvent - The rendered QR code of the purged request is deleted, if there is one.
pub fn create_event_handlers(notify_url: Option<String>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let client = Client::new();
    // --- On OrderPaid Handler ---
    hooks.on_order_paid(move |ev| {
        let OrderPaidEvent { order, payment_request } = &ev;
        info!(
            "📢️ Order #{} for customer #{} is paid. {} {} via [{}] (transaction {})",
            order.id,
            order.customer_id,
            order.total_price,
            order.currency,
            payment_request.bill_reference,
            payment_request.external_transaction_id.as_deref().unwrap_or("unknown")
        );
        let Some(url) = notify_url.clone() else {
            return no_op();
        };
        let client = client.clone();
        let body = order_paid_summary(&ev);
        Box::pin(async move {
            match client.post(&url).json(&body).send().await {
                Ok(res) if res.status().is_success() => {
                    debug!("📢️ Paid-order notification for order #{} delivered to {url}", ev.order.id)
                },
                Ok(res) => warn!(
                    "📢️ Paid-order notification for order #{} was rejected by {url} with status {}",
                    ev.order.id,
                    res.status()
                ),
                Err(e) => error!("📢️ Could not deliver paid-order notification for order #{}. {e}", ev.order.id),
            }
        })
    });
    // --- On PaymentRequestExpired Handler ---
    hooks.on_request_expired(move |ev| {
        let PaymentRequestExpiredEvent { payment_request } = ev;
        debug!("📢️ Payment request [{}] expired", payment_request.bill_reference);
        let Some(path) = payment_request.rendered_code_ref else {
            return no_op();
        };
        Box::pin(async move { remove_rendered_code(Path::new(&path)) })
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

pub fn order_paid_summary(ev: &OrderPaidEvent) -> Value {
    json!({
        "order_id": ev.order.id,
        "customer_id": ev.order.customer_id,
        "total_price": ev.order.total_price,
        "currency": ev.order.currency,
        "payment_method": ev.order.payment_method,
        "bill_reference": ev.payment_request.bill_reference,
        "correlation_hash": ev.payment_request.correlation_hash,
        "external_txn_id": ev.payment_request.external_transaction_id,
        "notified_at": Utc::now(),
    })
}

fn remove_rendered_code(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => trace!("📢️ Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!("📢️ Could not remove the rendered code at {}. {e}", path.display()),
    }
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
