use thiserror::Error;

use crate::{
    helpers::BillReferenceError,
    khqr::KhqrError,
    traits::{OrderManagementError, PaymentStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("{0}")]
    InvalidPayload(#[from] KhqrError),
    #[error("Invalid bill reference. {0}")]
    InvalidBillReference(#[from] BillReferenceError),
    #[error("No payment request matches {0}. It may have expired; generate a new code.")]
    UnknownPaymentRequest(String),
    #[error("A payment request with bill reference {0} already exists")]
    DuplicateBillReference(String),
    #[error("A payment request for this payload already exists ({0})")]
    DuplicatePaymentRequest(String),
    #[error("Payment request #{id} is paid, but no order could be attached to it. {reason}")]
    MaterializationFailed { id: i64, reason: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentStoreError> for PaymentFlowError {
    fn from(e: PaymentStoreError) -> Self {
        match e {
            PaymentStoreError::DatabaseError(s) => PaymentFlowError::DatabaseError(s),
            PaymentStoreError::DuplicateBillReference(r) => PaymentFlowError::DuplicateBillReference(r),
            PaymentStoreError::DuplicateCorrelationHash(h) => PaymentFlowError::DuplicatePaymentRequest(h),
        }
    }
}

impl From<OrderManagementError> for PaymentFlowError {
    fn from(e: OrderManagementError) -> Self {
        PaymentFlowError::DatabaseError(e.to_string())
    }
}
