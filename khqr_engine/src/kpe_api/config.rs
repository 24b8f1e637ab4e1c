use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAYMENT_METHOD: &str = "KHQR";

/// Who gets paid. Every payload the engine generates carries these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantProfile {
    /// Identifies the payment network in the merchant account group.
    pub provider_id: String,
    pub payee_account: String,
    pub payee_display_name: String,
    pub merchant_city: String,
    pub store_label: String,
    pub terminal_label: String,
}

/// Tuning knobs for the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// How far either side of a payment request's creation time an unreferenced order may be and still be adopted.
    pub match_window: Duration,
    /// Pending requests older than this are purged by the janitor.
    pub pending_request_ttl: Duration,
    /// The payment method recorded on synthesized orders, and required of adopted ones.
    pub payment_method: String,
    /// Upper bound on a single verifier call.
    pub verification_timeout: StdDuration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            match_window: Duration::minutes(30),
            pending_request_ttl: Duration::minutes(60),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            verification_timeout: StdDuration::from_secs(10),
        }
    }
}
