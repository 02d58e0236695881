//! # Coinbase Commerce tools
//!
//! A thin client for the parts of the Coinbase Commerce API used by the checkout gateway:
//! * Creating, fetching and listing charges ([`CoinbaseApi`]).
//! * Verifying and parsing webhook deliveries ([`WebhookVerifier`]).
//!
//! Nothing in this crate touches local storage. Correlating charges with orders is left to the caller.
mod api;
mod config;
mod data_objects;
mod error;
mod webhook;

pub use api::CoinbaseApi;
pub use config::CoinbaseConfig;
pub use data_objects::{Charge, ChargeStatus, Money, NewCharge, TimelineEntry};
pub use error::{CoinbaseApiError, WebhookError};
pub use webhook::{sign_payload, EventType, WebhookEvent, WebhookVerifier, SIGNATURE_HEADER};
