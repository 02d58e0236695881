//! # Crypto Checkout Gateway server
//! This crate hosts the HTTP surface of the checkout gateway. It is responsible for:
//! * Authenticating buyers and admins with bearer tokens issued by an external auth service.
//! * Exposing the cart, checkout, order and crypto payment APIs of [`ccg_engine`].
//! * Receiving Coinbase Commerce webhooks, verifying their signatures and reconciling them against the ledger.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Buyer and admin routes. See [routes](routes/index.html).
//! * `/webhooks/coinbase`: Coinbase Commerce event notifications.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
