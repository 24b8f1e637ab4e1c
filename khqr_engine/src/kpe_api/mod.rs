//! # Payment engine public API
//!
//! The `kpe_api` module exposes the programmatic API for the payment engine.
//!
//! * [`payment_flow_api`] generates payment requests and reconciles provider confirmations into paid orders.
//! * [`materializer`] attaches a confirmed payment request to an existing order, or creates one.
//! * [`match_strategy`] holds the heuristic used to pick an existing order for a payment.
//! * [`notifications`] announces results to the registered event hooks.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits, a verifier for the
//! payment provider, and the merchant and reconciliation configuration:
//!
//! ```rust,ignore
//! use khqr_engine::{PaymentFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = PaymentFlowApi::new(db, verifier, profile, ReconciliationConfig::default(), producers);
//! let request = api.generate_payment_request(NewPaymentRequestParams::new(amount, Currency::Usd)).await?;
//! let result = api.check_payment(&request.correlation_hash).await?;
//! ```
pub mod config;
pub mod errors;
pub mod match_strategy;
pub mod materializer;
pub mod notifications;
pub mod payment_flow_api;
pub mod payment_objects;
