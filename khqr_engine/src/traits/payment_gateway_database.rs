use crate::traits::{OrderManagement, PaymentRequestStore};

/// The highest level of behaviour for backends supporting the payment engine.
///
/// A backend that stores both payment requests and orders in the same database implements this trait and can be
/// handed to [`crate::PaymentFlowApi`] directly.
pub trait PaymentGatewayDatabase: Clone + PaymentRequestStore + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;
}
