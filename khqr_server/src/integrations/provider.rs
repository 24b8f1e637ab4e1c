use khqr_engine::traits::{PaymentVerifier, VerificationError, VerificationOutcome};
use khqr_provider::{ProviderApi, ProviderApiError, TransactionStatus};
use log::*;

/// Verifies payments against the provider's transaction check API.
#[derive(Clone)]
pub struct ProviderVerifier {
    api: ProviderApi,
}

impl ProviderVerifier {
    pub fn new(api: ProviderApi) -> Self {
        Self { api }
    }
}

impl PaymentVerifier for ProviderVerifier {
    async fn verify(&self, correlation_hash: &str) -> Result<VerificationOutcome, VerificationError> {
        match self.api.check_transaction(correlation_hash).await {
            Ok(TransactionStatus::Confirmed { txn_id }) => Ok(VerificationOutcome::Confirmed { external_txn_id: txn_id }),
            Ok(TransactionStatus::NotFound { .. }) => Ok(VerificationOutcome::NotYet),
            Err(ProviderApiError::JsonError(e)) => {
                debug!("📡️ The provider sent a response we could not read. {e}");
                Err(VerificationError::InvalidResponse(e))
            },
            Err(e) => Err(VerificationError::ExternalApiUnavailable(e.to_string())),
        }
    }
}
