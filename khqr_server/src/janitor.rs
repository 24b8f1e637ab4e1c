use std::time::Duration as StdDuration;

use chrono::Duration;
use khqr_engine::{db_types::PaymentRequest, PaymentFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::provider::ProviderVerifier;

/// Starts the janitor. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, pending payment requests that are older than `ttl` and not linked to an order are deleted.
pub fn start_janitor(
    api: PaymentFlowApi<SqliteDatabase, ProviderVerifier>,
    ttl: Duration,
    interval: StdDuration,
) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        warn!("🕰️ A zero janitor interval is not allowed. Running every second instead.");
        StdDuration::from_secs(1)
    } else {
        interval
    };
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Payment request janitor started. Requests expire after {} minutes", ttl.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running stale payment request purge");
            match api.purge_stale_requests(ttl).await {
                Ok(purged) if purged.is_empty() => trace!("🕰️ No stale payment requests"),
                Ok(purged) => {
                    info!("🕰️ {} stale payment requests purged", purged.len());
                    debug!("🕰️ Purged: {}", request_list(&purged));
                },
                Err(e) => {
                    error!("🕰️ Error purging stale payment requests: {e}");
                },
            }
        }
    })
}

fn request_list(requests: &[PaymentRequest]) -> String {
    requests
        .iter()
        .map(|r| format!("[{}] bill_reference: {} amount: {} {}", r.id, r.bill_reference, r.amount, r.currency))
        .collect::<Vec<String>>()
        .join(", ")
}
