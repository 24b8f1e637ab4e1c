use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The provider has seen the payment.
    Confirmed { external_txn_id: Option<String> },
    /// The provider has not seen the payment (yet).
    NotYet,
}

/// Asks the payment provider whether the payload identified by its correlation hash has been paid.
///
/// Implementations must bound the call with a timeout. Any failure is reported as an error, which callers treat as
/// "still pending".
#[allow(async_fn_in_trait)]
pub trait PaymentVerifier {
    async fn verify(&self, correlation_hash: &str) -> Result<VerificationOutcome, VerificationError>;
}

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("The payment provider API is unavailable: {0}")]
    ExternalApiUnavailable(String),
    #[error("The payment provider returned an unexpected response: {0}")]
    InvalidResponse(String),
}
