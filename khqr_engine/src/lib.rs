//! KHQR Payment Engine
//!
//! The payment engine lets a merchant accept payments through dynamic, merchant-presented QR codes, and turns the
//! provider's asynchronous confirmations into paid orders exactly once.
//!
//! The library is divided into these main sections:
//! 1. The payload codec ([`mod@khqr`]). Pure functions to build and parse payloads and their checksum.
//! 2. The backend contracts ([`mod@traits`]) and a SQLite implementation of them ([`SqliteDatabase`]). The data types
//!    stored by the backends live in [`mod@db_types`].
//! 3. The payment engine public API ([`mod@kpe_api`]), chiefly [`PaymentFlowApi`], which drives the payment-request
//!    lifecycle: generate, poll, webhook, materialize, notify, purge.
//!
//! The engine also emits events ([`mod@events`]) that the application can hook into, for example to send a
//! notification when an order has been paid.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod khqr;
pub mod kpe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use kpe_api::{
    config::{MerchantProfile, ReconciliationConfig},
    errors::PaymentFlowError,
    match_strategy::{ClosestInTime, MatchStrategy},
    materializer::OrderMaterializer,
    notifications::NotificationDispatcher,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
