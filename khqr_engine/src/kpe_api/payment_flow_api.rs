use std::{fmt::Debug, sync::Arc};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewPaymentRequest, PaymentRequest, PaymentStatus},
    events::EventProducers,
    helpers::{generate_bill_reference, validate_bill_reference},
    khqr::{PayloadBuilder, PayloadRequest},
    kpe_api::{
        config::{MerchantProfile, ReconciliationConfig},
        errors::PaymentFlowError,
        match_strategy::MatchStrategy,
        materializer::OrderMaterializer,
        notifications::NotificationDispatcher,
        payment_objects::{
            NewPaymentRequestParams,
            PaymentCheckResult,
            PaymentReference,
            ReconciliationOutcome,
            WebhookNotification,
        },
    },
    traits::{PaymentGatewayDatabase, PaymentVerifier, QrRenderer, VerificationOutcome},
};

/// `PaymentFlowApi` is the primary API for the payment-request lifecycle: generating codes, and reconciling provider
/// confirmations (from client polling or provider webhooks) into exactly one paid order per request.
///
/// Poll and webhook may race each other, in this process or in another one sharing the database. The API holds no
/// locks. All mutual exclusion comes from the store's conditional updates and the unique payment reference on
/// orders.
#[derive(Clone)]
pub struct PaymentFlowApi<B, V> {
    db: B,
    verifier: V,
    builder: PayloadBuilder,
    profile: MerchantProfile,
    config: ReconciliationConfig,
    materializer: OrderMaterializer<B>,
    dispatcher: NotificationDispatcher,
    renderer: Option<Arc<dyn QrRenderer + Send + Sync>>,
}

impl<B, V> Debug for PaymentFlowApi<B, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B: Clone, V> PaymentFlowApi<B, V> {
    pub fn new(
        db: B,
        verifier: V,
        profile: MerchantProfile,
        config: ReconciliationConfig,
        producers: EventProducers,
    ) -> Self {
        let builder = PayloadBuilder::new(profile.provider_id.clone());
        let materializer = OrderMaterializer::new(db.clone(), config.match_window, config.payment_method.clone());
        let dispatcher = NotificationDispatcher::new(producers);
        Self { db, verifier, builder, profile, config, materializer, dispatcher, renderer: None }
    }

    pub fn with_match_strategy<S: MatchStrategy + Send + Sync + 'static>(mut self, strategy: S) -> Self {
        self.materializer = self.materializer.with_strategy(strategy);
        self
    }

    pub fn with_renderer<R: QrRenderer + Send + Sync + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn profile(&self) -> &MerchantProfile {
        &self.profile
    }
}

impl<B, V> PaymentFlowApi<B, V>
where
    B: PaymentGatewayDatabase,
    V: PaymentVerifier,
{
    /// Builds a payload for the merchant profile, stores a `Pending` payment request and then renders the code (if a
    /// renderer is configured).
    ///
    /// Nothing is persisted or rendered if the payload cannot be built or the store rejects the request. A rendering
    /// failure only costs the request its `rendered_code_ref`.
    pub async fn generate_payment_request(
        &self,
        params: NewPaymentRequestParams,
    ) -> Result<PaymentRequest, PaymentFlowError> {
        let bill_reference = match params.bill_reference {
            Some(r) => {
                let r = r.trim().to_string();
                validate_bill_reference(&r)?;
                r
            },
            None => generate_bill_reference(),
        };
        let payload_request = PayloadRequest {
            payee_account: self.profile.payee_account.clone(),
            payee_display_name: self.profile.payee_display_name.clone(),
            merchant_city: self.profile.merchant_city.clone(),
            amount: params.amount.to_string(),
            currency: params.currency,
            store_label: self.profile.store_label.clone(),
            bill_reference: bill_reference.clone(),
            terminal_label: self.profile.terminal_label.clone(),
        };
        let khqr = self.builder.build(&payload_request)?;
        trace!("🔄️🆕️ Payload for [{bill_reference}] built. Hash: {}", khqr.correlation_hash);
        let draft = NewPaymentRequest {
            correlation_hash: khqr.correlation_hash,
            bill_reference,
            payload: khqr.payload,
            rendered_code_ref: None,
            amount: params.amount,
            currency: params.currency,
            requester_user_id: params.user_id,
        };
        let mut request = self.db.create_payment_request(draft).await?;
        info!(
            "🔄️🆕️ Payment request #{} [{}] for {} {} created",
            request.id, request.bill_reference, request.amount, request.currency
        );
        if let Some(code_ref) = self.render(&request).await {
            match self.db.set_rendered_code_ref(request.id, &code_ref).await {
                Ok(true) => request.rendered_code_ref = Some(code_ref),
                Ok(false) => {
                    warn!("🔄️🆕️ Payment request [{}] disappeared before its code was recorded", request.bill_reference)
                },
                Err(e) => warn!("🔄️🆕️ Could not record the rendered code for [{}]. {e}", request.bill_reference),
            }
        }
        Ok(request)
    }

    /// QR encoding and storage are blocking, so they run off the async workers.
    async fn render(&self, request: &PaymentRequest) -> Option<String> {
        let renderer = Arc::clone(self.renderer.as_ref()?);
        let payload = request.payload.clone();
        let bill_reference = request.bill_reference.clone();
        let hash = request.correlation_hash.clone();
        let result = tokio::task::spawn_blocking(move || renderer.render(&payload, &bill_reference, &hash)).await;
        match result {
            Ok(Ok(r)) => Some(r),
            Ok(Err(e)) => {
                warn!("🔄️🆕️ Could not render the code for [{}]. The request has no code. {e}", request.bill_reference);
                None
            },
            Err(e) => {
                warn!("🔄️🆕️ The renderer for [{}] did not complete. {e}", request.bill_reference);
                None
            },
        }
    }

    /// Poll trigger. Asks the provider about a pending request and reconciles it if it has been paid.
    ///
    /// Verifier failures and timeouts are logged and reported as "still pending". A request that is already paid but
    /// has no order yet is retried without asking the provider again.
    pub async fn check_payment(&self, correlation_hash: &str) -> Result<PaymentCheckResult, PaymentFlowError> {
        let request = self
            .db
            .fetch_payment_request_by_hash(correlation_hash)
            .await?
            .ok_or_else(|| PaymentFlowError::UnknownPaymentRequest(correlation_hash.to_string()))?;
        let outcome = match (request.status, request.linked_order_id) {
            (PaymentStatus::Paid, Some(order_id)) => {
                trace!("🔄️🔍️ Payment request [{}] is already paid and linked", request.bill_reference);
                ReconciliationOutcome::AlreadyMaterialized { order_id }
            },
            (PaymentStatus::Paid, None) => {
                info!("🔄️🔍️ Payment request [{}] is paid but unlinked. Retrying", request.bill_reference);
                let txn_id = request.external_transaction_id.clone();
                self.reconcile(&request, txn_id.as_deref()).await
            },
            (PaymentStatus::Pending, _) => match self.verify(&request).await {
                Some(txn_id) => self.reconcile(&request, txn_id.as_deref()).await,
                None => ReconciliationOutcome::StillPending,
            },
        };
        self.report(request, outcome).await
    }

    /// Returns `Some(external transaction id)` if the provider confirmed the payment.
    async fn verify(&self, request: &PaymentRequest) -> Option<Option<String>> {
        let hash = request.correlation_hash.as_str();
        let result = tokio::time::timeout(self.config.verification_timeout, self.verifier.verify(hash)).await;
        match result {
            Ok(Ok(VerificationOutcome::Confirmed { external_txn_id })) => {
                info!("🔄️🔍️ Provider confirmed payment for [{}]", request.bill_reference);
                Some(external_txn_id)
            },
            Ok(Ok(VerificationOutcome::NotYet)) => {
                trace!("🔄️🔍️ Provider has not seen a payment for [{}] yet", request.bill_reference);
                None
            },
            Ok(Err(e)) => {
                warn!("🔄️🔍️ Could not verify payment for [{}]. Treating it as pending. {e}", request.bill_reference);
                None
            },
            Err(_) => {
                warn!(
                    "🔄️🔍️ Verification for [{}] timed out after {:?}. Treating it as pending.",
                    request.bill_reference, self.config.verification_timeout
                );
                None
            },
        }
    }

    /// Webhook trigger. Unknown references are an error (the request may have been purged); non-success statuses
    /// are acknowledged without changing anything.
    pub async fn process_webhook(&self, notification: WebhookNotification) -> Result<PaymentCheckResult, PaymentFlowError> {
        let request = match &notification.reference {
            PaymentReference::BillReference(r) => self.db.fetch_payment_request_by_bill_reference(r).await?,
            PaymentReference::CorrelationHash(h) => self.db.fetch_payment_request_by_hash(h).await?,
        };
        let Some(request) = request else {
            warn!("🔄️📨️ Webhook for unknown payment request {}. Ignoring it.", notification.reference.as_str());
            return Err(PaymentFlowError::UnknownPaymentRequest(notification.reference.as_str().to_string()));
        };
        if !notification.is_success() {
            info!(
                "🔄️📨️ Webhook for [{}] reported status '{}'. No action taken.",
                request.bill_reference, notification.status
            );
            return Ok(PaymentCheckResult::new(request, ReconciliationOutcome::Acknowledged));
        }
        debug!("🔄️📨️ Webhook reports payment for [{}]", request.bill_reference);
        let outcome = self.reconcile(&request, notification.external_txn_id.as_deref()).await;
        self.report(request, outcome).await
    }

    /// Runs [`Self::confirm_and_materialize`], downgrading a materialization failure to an outcome so that callers still
    /// learn that the request is paid.
    async fn reconcile(&self, request: &PaymentRequest, external_txn_id: Option<&str>) -> ReconciliationOutcome {
        match self.confirm_and_materialize(request, external_txn_id).await {
            Ok(outcome) => outcome,
            Err(PaymentFlowError::UnknownPaymentRequest(_)) => {
                warn!("🔄️💰️ Payment request [{}] was purged while it was being reconciled", request.bill_reference);
                ReconciliationOutcome::StillPending
            },
            Err(e) => {
                error!("🔄️💰️ Reconciliation of [{}] did not complete. {e}", request.bill_reference);
                ReconciliationOutcome::AwaitingMaterialization
            },
        }
    }

    /// Re-reads the request so the caller sees the post-reconciliation status.
    async fn report(
        &self,
        request: PaymentRequest,
        outcome: ReconciliationOutcome,
    ) -> Result<PaymentCheckResult, PaymentFlowError> {
        let fresh = match self.db.fetch_payment_request(request.id).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => request,
            Err(e) => {
                warn!("🔄️ Could not re-read payment request #{}. Reporting the last known state. {e}", request.id);
                request
            },
        };
        Ok(PaymentCheckResult::new(fresh, outcome))
    }

    /// Transitions the request to `Paid` and attaches exactly one order to it.
    ///
    /// Safe to call any number of times, concurrently, from any trigger. Exactly one caller gets
    /// [`ReconciliationOutcome::Materialized`] and dispatches the notification. Everybody else gets
    /// [`ReconciliationOutcome::AlreadyMaterialized`].
    pub async fn confirm_and_materialize(
        &self,
        request: &PaymentRequest,
        external_txn_id: Option<&str>,
    ) -> Result<ReconciliationOutcome, PaymentFlowError> {
        let id = request.id;
        let marked = self.db.mark_paid(id, external_txn_id).await?;
        let current = self
            .db
            .fetch_payment_request(id)
            .await?
            .ok_or_else(|| PaymentFlowError::UnknownPaymentRequest(request.correlation_hash.clone()))?;
        if marked {
            debug!("🔄️💰️ Payment request [{}] marked as paid", current.bill_reference);
        } else if let Some(order_id) = current.linked_order_id {
            debug!("🔄️💰️ Payment request [{}] is already linked to order #{order_id}", current.bill_reference);
            return Ok(ReconciliationOutcome::AlreadyMaterialized { order_id });
        }
        let order = self.materializer.materialize(&current).await.map_err(|e| PaymentFlowError::MaterializationFailed {
            id,
            reason: e.to_string(),
        })?;
        if self.db.link_order(id, order.id).await? {
            let linked = PaymentRequest { linked_order_id: Some(order.id), ..current };
            info!("🔄️💰️ Payment request [{}] linked to order #{}", linked.bill_reference, order.id);
            self.dispatcher.announce(&order, &linked).await;
            Ok(ReconciliationOutcome::Materialized(order))
        } else {
            let order_id = self
                .db
                .fetch_payment_request(id)
                .await?
                .and_then(|r| r.linked_order_id)
                .unwrap_or(order.id);
            debug!("🔄️💰️ A concurrent trigger linked [{}] to order #{order_id} first", current.bill_reference);
            Ok(ReconciliationOutcome::AlreadyMaterialized { order_id })
        }
    }

    /// Deletes unlinked pending requests older than `ttl` and announces each one. Returns the deleted requests.
    ///
    /// Nothing is purged when `ttl` is not positive.
    pub async fn purge_stale_requests(&self, ttl: Duration) -> Result<Vec<PaymentRequest>, PaymentFlowError> {
        if ttl <= Duration::zero() {
            warn!("🔄️🗑️ Refusing to purge payment requests with a non-positive TTL ({ttl})");
            return Ok(Vec::new());
        }
        let cutoff = Utc::now() - ttl;
        let purged = self.db.purge_stale(cutoff, true).await?;
        if !purged.is_empty() {
            info!("🔄️🗑️ {} stale payment requests purged", purged.len());
        }
        self.dispatcher.announce_expired(&purged).await;
        Ok(purged)
    }

    pub async fn fetch_payment_request(&self, reference: &PaymentReference) -> Result<PaymentRequest, PaymentFlowError> {
        let request = match reference {
            PaymentReference::BillReference(r) => self.db.fetch_payment_request_by_bill_reference(r).await?,
            PaymentReference::CorrelationHash(h) => self.db.fetch_payment_request_by_hash(h).await?,
        };
        request.ok_or_else(|| PaymentFlowError::UnknownPaymentRequest(reference.as_str().to_string()))
    }
}
