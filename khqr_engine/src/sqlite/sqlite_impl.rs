//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use kpg_common::{Amount, Currency};
use log::*;
use sqlx::SqlitePool;

use super::db::{customers, db_url, invoices, new_pool, orders, payment_requests};
use crate::{
    db_types::{Customer, Invoice, NewOrder, NewPaymentRequest, Order, OrderItem, PaymentRequest},
    traits::{
        AdoptionCandidateQuery,
        OrderManagement,
        OrderManagementError,
        PaymentGatewayDatabase,
        PaymentRequestStore,
        PaymentStoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl PaymentRequestStore for SqliteDatabase {
    async fn create_payment_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        payment_requests::insert_payment_request(request, &mut conn).await
    }

    async fn fetch_payment_request_by_hash(&self, hash: &str) -> Result<Option<PaymentRequest>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::fetch_by_hash(hash, &mut conn).await?)
    }

    async fn fetch_payment_request_by_bill_reference(
        &self,
        bill_reference: &str,
    ) -> Result<Option<PaymentRequest>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::fetch_by_bill_reference(bill_reference, &mut conn).await?)
    }

    async fn fetch_payment_request(&self, id: i64) -> Result<Option<PaymentRequest>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::fetch_by_id(id, &mut conn).await?)
    }

    async fn mark_paid(&self, id: i64, external_txn_id: Option<&str>) -> Result<bool, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::mark_paid(id, external_txn_id, &mut conn).await?)
    }

    async fn set_rendered_code_ref(&self, id: i64, code_ref: &str) -> Result<bool, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::set_rendered_code_ref(id, code_ref, &mut conn).await?)
    }

    async fn link_order(&self, id: i64, order_id: i64) -> Result<bool, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::link_order(id, order_id, &mut conn).await?)
    }

    async fn purge_stale(
        &self,
        older_than: DateTime<Utc>,
        only_unlinked: bool,
    ) -> Result<Vec<PaymentRequest>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_requests::purge_stale(older_than, only_unlinked, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    /// The order, its line items and the invoice are written in a single transaction. The first statement is a write,
    /// so concurrent callers wait on SQLite's busy timeout instead of failing a lock upgrade.
    async fn create_order_with_invoice(&self, order: NewOrder, paid: bool) -> Result<Order, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let new_order = orders::insert_order(&order, &mut tx).await?;
        orders::insert_order_items(new_order.id, &order.items, &mut tx).await?;
        invoices::insert_invoice(new_order.id, new_order.total_price, paid, &mut tx).await?;
        let new_order = if paid {
            orders::mark_order_paid(new_order.id, &mut tx).await?.ok_or(OrderManagementError::OrderNotFound(new_order.id))?
        } else {
            new_order
        };
        tx.commit().await?;
        debug!("🗃️ Order #{} for {} {} saved with its invoice", new_order.id, new_order.total_price, new_order.currency);
        Ok(new_order)
    }

    async fn create_invoice(&self, order_id: i64, amount: Amount, paid: bool) -> Result<Invoice, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        invoices::insert_invoice(order_id, amount, paid, &mut conn).await?.ok_or(OrderManagementError::OrderNotFound(order_id))
    }

    async fn mark_order_paid(&self, order_id: i64) -> Result<Order, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::mark_order_paid(order_id, &mut tx).await?.ok_or(OrderManagementError::OrderNotFound(order_id))?;
        let n = invoices::mark_invoices_paid(order_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order #{order_id} and {n} invoices marked as paid");
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_reference(reference, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_invoices_for_order(&self, order_id: i64) -> Result<Vec<Invoice>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(invoices::fetch_invoices_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_adoption_candidates(&self, query: &AdoptionCandidateQuery) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_adoption_candidates(query, &mut conn).await?)
    }

    async fn adopt_order(&self, order_id: i64, reference: &str) -> Result<Option<Order>, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let adopted = orders::adopt_order(order_id, reference, &mut tx).await?;
        if adopted.is_some() {
            invoices::mark_invoices_paid(order_id, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(adopted)
    }

    async fn fetch_or_create_customer_for_user(&self, user_id: i64) -> Result<Customer, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_or_create_customer_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_recent_customer(
        &self,
        amount: Amount,
        currency: Currency,
        since: DateTime<Utc>,
    ) -> Result<Option<Customer>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_recent_customer(amount, currency, since, &mut conn).await?)
    }

    async fn fetch_guest_customer(&self) -> Result<Customer, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_guest_customer(&mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `KPG_DATABASE_URL` environment variable for the url
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the embedded migrations against this database.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
