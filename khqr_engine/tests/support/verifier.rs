use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use khqr_engine::traits::{PaymentVerifier, VerificationError, VerificationOutcome};

/// A verifier whose answers are set by the test.
#[derive(Clone, Default)]
pub struct ScriptedVerifier {
    answers: Arc<Mutex<HashMap<String, Result<VerificationOutcome, VerificationError>>>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedVerifier {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    pub fn confirm(&self, hash: &str, txn_id: &str) {
        let outcome = VerificationOutcome::Confirmed { external_txn_id: Some(txn_id.to_string()) };
        self.answers.lock().unwrap().insert(hash.to_string(), Ok(outcome));
    }

    pub fn fail(&self, hash: &str) {
        let err = VerificationError::ExternalApiUnavailable("connection refused".into());
        self.answers.lock().unwrap().insert(hash.to_string(), Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentVerifier for ScriptedVerifier {
    async fn verify(&self, correlation_hash: &str) -> Result<VerificationOutcome, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let answer = self.answers.lock().unwrap().get(correlation_hash).cloned();
        answer.unwrap_or(Ok(VerificationOutcome::NotYet))
    }
}
