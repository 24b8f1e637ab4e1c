//! # KHQR payment server
//! This module hosts the server code for the KHQR payment gateway. It is responsible for:
//! Generating payment requests (payload plus rendered QR code) for the storefront.
//! Answering storefront polls by asking the payment provider whether a payload has been paid.
//! Receiving payment webhooks from the provider.
//! Running the janitor that purges stale, unpaid payment requests.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/generate`: Creates a new payment request.
//! * `/payments/check`: Polls the provider for a payment request.
//! * `/payments/webhook`: Receives payment notifications from the provider.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod janitor;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
