use chrono::{DateTime, Utc};
use kpg_common::{Amount, Currency};
use thiserror::Error;

use crate::db_types::{Customer, Invoice, NewOrder, Order, OrderItem};

/// Filter for orders that could have been paid by a payment request but have not been tied to one yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdoptionCandidateQuery {
    pub amount: Amount,
    pub currency: Currency,
    pub payment_method: String,
    pub created_after: DateTime<Utc>,
    pub created_before: DateTime<Utc>,
}

/// Orders, invoices and customers belong to the surrounding storefront. The payment engine only creates and updates
/// them through this trait.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Creates the order, its line items and a single invoice for the full amount in one transaction.
    ///
    /// If the order carries a payment reference that is already taken, this returns
    /// [`OrderManagementError::DuplicatePaymentReference`] and nothing is written.
    async fn create_order_with_invoice(&self, order: NewOrder, paid: bool) -> Result<Order, OrderManagementError>;

    async fn create_invoice(&self, order_id: i64, amount: Amount, paid: bool) -> Result<Invoice, OrderManagementError>;

    /// Marks the order and all its invoices as paid. Returns the updated order.
    async fn mark_order_paid(&self, order_id: i64) -> Result<Order, OrderManagementError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError>;

    async fn fetch_invoices_for_order(&self, order_id: i64) -> Result<Vec<Invoice>, OrderManagementError>;

    /// Unpaid orders with no payment reference matching the query.
    async fn fetch_adoption_candidates(&self, query: &AdoptionCandidateQuery) -> Result<Vec<Order>, OrderManagementError>;

    /// Ties an existing order to a payment reference and marks it paid, but only if the order is still unpaid and
    /// unreferenced. Returns `None` if another writer got there first.
    async fn adopt_order(&self, order_id: i64, reference: &str) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_or_create_customer_for_user(&self, user_id: i64) -> Result<Customer, OrderManagementError>;

    /// The customer of the most recent order of the given amount and currency, created after `since`.
    async fn fetch_recent_customer(
        &self,
        amount: Amount,
        currency: Currency,
        since: DateTime<Utc>,
    ) -> Result<Option<Customer>, OrderManagementError>;

    /// The single guest customer, created on first use.
    async fn fetch_guest_customer(&self) -> Result<Customer, OrderManagementError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("An order with payment reference {0} already exists")]
    DuplicatePaymentReference(String),
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}
