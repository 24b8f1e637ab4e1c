use std::fmt::Display;

use khqr_engine::{
    db_types::{PaymentRequest, PaymentStatus},
    payment_objects::{NewPaymentRequestParams, PaymentCheckResult, PaymentReference, WebhookNotification},
};
use kpg_common::{Amount, Currency};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /payments/generate`. `amount` may be a JSON string or number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePaymentParams {
    pub amount: Amount,
    pub currency: Currency,
    #[serde(default)]
    pub bill_reference: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl From<GeneratePaymentParams> for NewPaymentRequestParams {
    fn from(value: GeneratePaymentParams) -> Self {
        let mut params = NewPaymentRequestParams::new(value.amount, value.currency);
        params.bill_reference = value.bill_reference.filter(|s| !s.trim().is_empty());
        params.user_id = value.user_id;
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPayment {
    pub payload: String,
    pub correlation_hash: String,
    pub bill_reference: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_code_ref: Option<String>,
}

impl From<PaymentRequest> for GeneratedPayment {
    fn from(r: PaymentRequest) -> Self {
        Self {
            payload: r.payload,
            correlation_hash: r.correlation_hash,
            bill_reference: r.bill_reference,
            amount: r.amount,
            currency: r.currency,
            status: r.status,
            rendered_code_ref: r.rendered_code_ref,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckPaymentParams {
    pub correlation_hash: String,
}

/// Best-known state of a payment request, returned by both the check and webhook routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub bill_reference: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_txn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl From<PaymentCheckResult> for PaymentStatusResponse {
    fn from(result: PaymentCheckResult) -> Self {
        Self {
            status: result.status(),
            external_txn_id: result.external_txn_id().map(String::from),
            order_id: result.linked_order_id(),
            bill_reference: result.payment_request.bill_reference,
        }
    }
}

/// Body of `POST /payments/webhook`. The provider identifies the payment by bill reference, correlation hash, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub bill_reference: Option<String>,
    #[serde(default)]
    pub correlation_hash: Option<String>,
    pub status: String,
    #[serde(default)]
    pub external_txn_id: Option<String>,
}

impl TryFrom<WebhookPayload> for WebhookNotification {
    type Error = ServerError;

    /// The correlation hash wins when both references are given.
    fn try_from(value: WebhookPayload) -> Result<Self, Self::Error> {
        let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let reference = match (non_empty(value.correlation_hash), non_empty(value.bill_reference)) {
            (Some(hash), _) => PaymentReference::CorrelationHash(hash),
            (None, Some(r)) => PaymentReference::BillReference(r),
            (None, None) => {
                return Err(ServerError::InvalidRequestBody(
                    "A webhook must carry a bill_reference or a correlation_hash".into(),
                ))
            },
        };
        Ok(WebhookNotification { reference, status: value.status, external_txn_id: value.external_txn_id })
    }
}
