//! # Backend contracts
//!
//! This module defines the behaviour that storage backends and external collaborators must expose for the payment
//! engine to drive the payment-request lifecycle.
//!
//! * [`PaymentRequestStore`] is the durable record of every generated payload. Its two conditional updates
//!   (`mark_paid` and `link_order`) are the only mutual exclusion the reconciliation engine relies on.
//! * [`OrderManagement`] is the seam into the surrounding application's orders, invoices and customers.
//! * [`PaymentGatewayDatabase`] ties the two together for backends (like SQLite) that implement both.
//! * [`PaymentVerifier`] asks the payment provider whether a payload has been paid.
//! * [`QrRenderer`] turns a payload into an image.
mod order_management;
mod payment_gateway_database;
mod payment_request_store;
mod payment_verifier;
mod qr_renderer;

pub use order_management::{AdoptionCandidateQuery, OrderManagement, OrderManagementError};
pub use payment_gateway_database::PaymentGatewayDatabase;
pub use payment_request_store::{PaymentRequestStore, PaymentStoreError};
pub use payment_verifier::{PaymentVerifier, VerificationError, VerificationOutcome};
pub use qr_renderer::{QrRenderer, RenderError};
