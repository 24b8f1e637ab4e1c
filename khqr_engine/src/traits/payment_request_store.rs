use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewPaymentRequest, PaymentRequest};

/// Durable storage for generated payment requests.
///
/// Implementations must make [`mark_paid`](Self::mark_paid) and [`link_order`](Self::link_order) single atomic
/// conditional updates. Two concurrent callers may both invoke them for the same request; exactly one may see `true`.
#[allow(async_fn_in_trait)]
pub trait PaymentRequestStore {
    /// Stores a new request. The status is always `Pending`, regardless of anything the caller might expect.
    async fn create_payment_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, PaymentStoreError>;

    async fn fetch_payment_request_by_hash(&self, hash: &str) -> Result<Option<PaymentRequest>, PaymentStoreError>;

    async fn fetch_payment_request_by_bill_reference(
        &self,
        bill_reference: &str,
    ) -> Result<Option<PaymentRequest>, PaymentStoreError>;

    async fn fetch_payment_request(&self, id: i64) -> Result<Option<PaymentRequest>, PaymentStoreError>;

    /// Flips the request from `Pending` to `Paid`. Returns `false` if the request was not `Pending` (or does not
    /// exist), in which case nothing is changed.
    async fn mark_paid(&self, id: i64, external_txn_id: Option<&str>) -> Result<bool, PaymentStoreError>;

    /// Records where the rendered code for the request lives. Returns `false` if the request does not exist.
    async fn set_rendered_code_ref(&self, id: i64, code_ref: &str) -> Result<bool, PaymentStoreError>;

    /// Links the request to an order. Returns `false` if the request already had a linked order.
    async fn link_order(&self, id: i64, order_id: i64) -> Result<bool, PaymentStoreError>;

    /// Deletes `Pending` requests created before `older_than`. When `only_unlinked` is set, requests that already have
    /// an order attached are kept. Returns the deleted records.
    async fn purge_stale(
        &self,
        older_than: DateTime<Utc>,
        only_unlinked: bool,
    ) -> Result<Vec<PaymentRequest>, PaymentStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("A payment request with correlation hash {0} already exists")]
    DuplicateCorrelationHash(String),
    #[error("A payment request with bill reference {0} already exists")]
    DuplicateBillReference(String),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}
