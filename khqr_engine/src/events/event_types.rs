use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentRequest};

/// Emitted exactly once per payment request, by whichever trigger (poll or webhook) linked the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment_request: PaymentRequest,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment_request: PaymentRequest) -> Self {
        Self { order, payment_request }
    }
}

/// Emitted by the janitor for every pending request it deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequestExpiredEvent {
    pub payment_request: PaymentRequest,
}

impl PaymentRequestExpiredEvent {
    pub fn new(payment_request: PaymentRequest) -> Self {
        Self { payment_request }
    }
}
