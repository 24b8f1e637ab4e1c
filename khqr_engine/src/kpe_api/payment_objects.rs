use kpg_common::{Amount, Currency};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentRequest, PaymentStatus};

/// What a caller asks for when generating a new code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentRequestParams {
    pub amount: Amount,
    pub currency: Currency,
    /// Generated when absent.
    pub bill_reference: Option<String>,
    pub user_id: Option<i64>,
}

impl NewPaymentRequestParams {
    pub fn new(amount: Amount, currency: Currency) -> Self {
        Self { amount, currency, bill_reference: None, user_id: None }
    }

    pub fn with_bill_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.bill_reference = Some(reference.into());
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// How the provider identifies the payment in a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentReference {
    BillReference(String),
    CorrelationHash(String),
}

impl PaymentReference {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentReference::BillReference(s) | PaymentReference::CorrelationHash(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub reference: PaymentReference,
    pub status: String,
    pub external_txn_id: Option<String>,
}

impl WebhookNotification {
    /// `SUCCESS`, `PAID` and `COMPLETED` (in any case) mean the payment went through. Anything else is informational.
    pub fn is_success(&self) -> bool {
        let status = self.status.trim();
        ["SUCCESS", "PAID", "COMPLETED"].iter().any(|s| status.eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The provider has not confirmed the payment (or could not be reached).
    StillPending,
    /// This call attached the order and sent the notification.
    Materialized(Order),
    /// Another trigger already attached order `order_id`. Nothing was done.
    AlreadyMaterialized { order_id: i64 },
    /// The request is paid but attaching an order failed. The next poll or webhook retries.
    AwaitingMaterialization,
    /// A webhook with a non-success status. Recorded in the logs only.
    Acknowledged,
}

/// The best-known state of a payment request after a reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCheckResult {
    pub payment_request: PaymentRequest,
    pub outcome: ReconciliationOutcome,
}

impl PaymentCheckResult {
    pub fn new(payment_request: PaymentRequest, outcome: ReconciliationOutcome) -> Self {
        Self { payment_request, outcome }
    }

    pub fn status(&self) -> PaymentStatus {
        self.payment_request.status
    }

    pub fn external_txn_id(&self) -> Option<&str> {
        self.payment_request.external_transaction_id.as_deref()
    }

    pub fn linked_order_id(&self) -> Option<i64> {
        match &self.outcome {
            ReconciliationOutcome::Materialized(order) => Some(order.id),
            ReconciliationOutcome::AlreadyMaterialized { order_id } => Some(*order_id),
            _ => self.payment_request.linked_order_id,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn success_statuses() {
        let note = |status: &str| WebhookNotification {
            reference: PaymentReference::BillReference("TRX1".into()),
            status: status.into(),
            external_txn_id: None,
        };
        for s in ["SUCCESS", "paid", "Completed", " success "] {
            assert!(note(s).is_success(), "{s}");
        }
        for s in ["FAILED", "PENDING", "", "SUCCESSFUL"] {
            assert!(!note(s).is_success(), "{s}");
        }
    }
}
