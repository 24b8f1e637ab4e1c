use std::{fmt::Debug, sync::Arc};

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Customer, NewOrder, NewOrderItem, Order, PaymentRequest},
    kpe_api::match_strategy::{ClosestInTime, MatchStrategy},
    traits::{AdoptionCandidateQuery, OrderManagement, OrderManagementError},
};

/// Attaches a confirmed payment request to an order, creating one if necessary.
///
/// [`materialize`](Self::materialize) is idempotent: once an order carries the request's correlation hash as its
/// payment reference, every later call returns that same order.
#[derive(Clone)]
pub struct OrderMaterializer<B> {
    db: B,
    strategy: Arc<dyn MatchStrategy + Send + Sync>,
    match_window: Duration,
    payment_method: String,
}

impl<B> Debug for OrderMaterializer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderMaterializer({}, window: {})", self.payment_method, self.match_window)
    }
}

impl<B> OrderMaterializer<B> {
    pub fn new<S: Into<String>>(db: B, match_window: Duration, payment_method: S) -> Self {
        Self { db, strategy: Arc::new(ClosestInTime), match_window, payment_method: payment_method.into() }
    }

    pub fn with_strategy<S: MatchStrategy + Send + Sync + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }
}

impl<B> OrderMaterializer<B>
where B: OrderManagement
{
    pub async fn materialize(&self, request: &PaymentRequest) -> Result<Order, OrderManagementError> {
        let hash = request.correlation_hash.as_str();
        if let Some(order) = self.already_referenced(hash).await? {
            return Ok(order);
        }
        if let Some(order) = self.adopt_existing(request).await? {
            return Ok(order);
        }
        self.synthesize(request).await
    }

    async fn already_referenced(&self, hash: &str) -> Result<Option<Order>, OrderManagementError> {
        match self.db.fetch_order_by_payment_reference(hash).await? {
            Some(order) => {
                trace!("🧾️ Order #{} already carries payment reference {hash}", order.id);
                let order = self.db.mark_order_paid(order.id).await?;
                Ok(Some(order))
            },
            None => Ok(None),
        }
    }

    async fn adopt_existing(&self, request: &PaymentRequest) -> Result<Option<Order>, OrderManagementError> {
        let query = AdoptionCandidateQuery {
            amount: request.amount,
            currency: request.currency,
            payment_method: self.payment_method.clone(),
            created_after: request.created_at - self.match_window,
            created_before: request.created_at + self.match_window,
        };
        let candidates = self.db.fetch_adoption_candidates(&query).await?;
        let Some(chosen) = self.strategy.select(request, &candidates) else {
            trace!("🧾️ No existing order matches payment request [{}]", request.bill_reference);
            return Ok(None);
        };
        debug!(
            "🧾️ Adopting order #{} (1 of {} candidates) for payment request [{}]",
            chosen.id,
            candidates.len(),
            request.bill_reference
        );
        match self.db.adopt_order(chosen.id, &request.correlation_hash).await {
            Ok(Some(order)) => Ok(Some(order)),
            // Somebody else got to the order first. If it was a concurrent trigger for this same request, the order
            // now carries our reference.
            Ok(None) | Err(OrderManagementError::DuplicatePaymentReference(_)) => {
                debug!("🧾️ Lost the race to adopt order #{}. Re-checking payment reference", chosen.id);
                self.already_referenced(&request.correlation_hash).await
            },
            Err(e) => Err(e),
        }
    }

    async fn synthesize(&self, request: &PaymentRequest) -> Result<Order, OrderManagementError> {
        let customer = self.customer_for(request).await?;
        let item = NewOrderItem::new(format!("Payment {}", request.bill_reference), 1, request.amount);
        let order = NewOrder::new(customer.id, request.currency, self.payment_method.clone(), vec![item])
            .with_payment_reference(request.correlation_hash.clone());
        match self.db.create_order_with_invoice(order, true).await {
            Ok(order) => {
                info!(
                    "🧾️ Created order #{} for customer #{} from payment request [{}]",
                    order.id, customer.id, request.bill_reference
                );
                Ok(order)
            },
            Err(OrderManagementError::DuplicatePaymentReference(reference)) => {
                debug!("🧾️ A concurrent materialization created the order for {reference} first");
                self.db
                    .fetch_order_by_payment_reference(&reference)
                    .await?
                    .ok_or(OrderManagementError::DuplicatePaymentReference(reference))
            },
            Err(e) => Err(e),
        }
    }

    /// The requester if known, else whoever most recently ordered the same amount, else the guest customer.
    async fn customer_for(&self, request: &PaymentRequest) -> Result<Customer, OrderManagementError> {
        if let Some(user_id) = request.requester_user_id {
            return self.db.fetch_or_create_customer_for_user(user_id).await;
        }
        let since = request.created_at - self.match_window;
        if let Some(customer) = self.db.fetch_recent_customer(request.amount, request.currency, since).await? {
            trace!("🧾️ Attributing payment request [{}] to recent customer #{}", request.bill_reference, customer.id);
            return Ok(customer);
        }
        self.db.fetch_guest_customer().await
    }
}
