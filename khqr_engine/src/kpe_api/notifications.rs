use log::*;

use crate::{
    db_types::{Order, PaymentRequest},
    events::{EventProducers, OrderPaidEvent, PaymentRequestExpiredEvent},
};

/// Announces reconciliation results to the registered hooks. Never fails.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    producers: EventProducers,
}

impl NotificationDispatcher {
    pub fn new(producers: EventProducers) -> Self {
        Self { producers }
    }

    pub async fn announce(&self, order: &Order, request: &PaymentRequest) {
        info!(
            "📢️ Order #{} paid: {} {} via [{}]",
            order.id, order.total_price, order.currency, request.bill_reference
        );
        if self.producers.order_paid_producer.is_empty() {
            trace!("📢️ No order paid hooks are registered");
        }
        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone(), request.clone())).await;
    }

    pub async fn announce_expired(&self, requests: &[PaymentRequest]) {
        for request in requests {
            trace!("📢️ Payment request [{}] expired", request.bill_reference);
            self.producers.publish_request_expired(PaymentRequestExpiredEvent::new(request.clone())).await;
        }
    }
}
