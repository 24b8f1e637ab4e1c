use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kpg_common::{Amount, Currency};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// The payload has been issued and no confirmation has been seen yet.
    Pending,
    /// The provider has confirmed the payment. This is terminal.
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "PENDING" => Ok(Self::Pending),
            "Paid" | "PAID" => Ok(Self::Paid),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    PaymentRequest    ---------------------------------------------------------
/// A generated payload and everything the reconciliation engine needs to know about it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: i64,
    /// Content hash of `payload`. Unique.
    pub correlation_hash: String,
    /// Unique merchant-side reference, embedded in the payload's additional data group.
    pub bill_reference: String,
    pub payload: String,
    /// Where the rendered QR image lives, if rendering succeeded.
    pub rendered_code_ref: Option<String>,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    /// Set at most once, when the confirmed payment has been attached to an order.
    pub linked_order_id: Option<i64>,
    pub requester_user_id: Option<i64>,
    pub external_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    pub fn is_linked(&self) -> bool {
        self.linked_order_id.is_some()
    }
}

//--------------------------------------  NewPaymentRequest   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentRequest {
    pub correlation_hash: String,
    pub bill_reference: String,
    pub payload: String,
    pub rendered_code_ref: Option<String>,
    pub amount: Amount,
    pub currency: Currency,
    pub requester_user_id: Option<i64>,
}

//--------------------------------------       Customer       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub total_price: Amount,
    pub currency: Currency,
    pub payment_method: String,
    /// The correlation hash of the payment request that paid for this order. Unique when set.
    pub payment_reference: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Amount,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(description: S, quantity: i64, unit_price: Amount) -> Self {
        Self { description: description.into(), quantity, unit_price }
    }

    pub fn total(&self) -> Amount {
        self.unit_price * self.quantity
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub items: Vec<NewOrderItem>,
    pub total_price: Amount,
    pub currency: Currency,
    pub payment_method: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Creates a new order whose total is the sum of its line items.
    pub fn new<S: Into<String>>(customer_id: i64, currency: Currency, payment_method: S, items: Vec<NewOrderItem>) -> Self {
        let total_price = items.iter().map(NewOrderItem::total).sum();
        Self {
            customer_id,
            items,
            total_price,
            currency,
            payment_method: payment_method.into(),
            payment_reference: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_payment_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------       Invoice        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub order_id: i64,
    pub amount: Amount,
    pub currency: Currency,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_order_totals_items() {
        let items = vec![
            NewOrderItem::new("Coffee", 2, Amount::from_minor_units(250)),
            NewOrderItem::new("Cake", 1, Amount::from_minor_units(300)),
        ];
        let order = NewOrder::new(1, Currency::Usd, "KHQR", items);
        assert_eq!(order.total_price, Amount::from_minor_units(800));
        assert!(order.payment_reference.is_none());
    }

    #[test]
    fn payment_status_strings() {
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("Nonsense".parse::<PaymentStatus>().is_err());
        assert_eq!(serde_json::to_string(&PaymentStatus::Pending).unwrap(), "\"PENDING\"");
    }
}
