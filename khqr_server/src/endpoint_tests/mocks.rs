use khqr_engine::traits::{PaymentVerifier, VerificationError, VerificationOutcome};
use mockall::mock;

mock! {
    pub Verifier {}
    impl PaymentVerifier for Verifier {
        async fn verify(&self, correlation_hash: &str) -> Result<VerificationOutcome, VerificationError>;
    }
}
