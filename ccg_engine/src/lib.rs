//! Crypto Checkout Gateway engine
//!
//! This library contains the provider-agnostic core of the checkout gateway: carts, checkout, payment claims and the
//! reconciliation of payment provider events against the local ledger.
//!
//! The library is divided into three main sections:
//! 1. Backend traits ([`mod@traits`]) describe what a ledger must provide (carts, orders, payments and processed event
//!    markers) and what a payment gateway must provide (create, query and list charges). [`SqliteDatabase`] is the
//!    bundled ledger backend. The data types stored in the ledger live in [`mod@db_types`] and are public.
//! 2. The public API: [`CartApi`], [`CheckoutApi`], [`PaymentFlowApi`] and [`ReconciliationApi`]. Each is generic over
//!    the backend traits it needs.
//! 3. Post-commit event hooks ([`mod@events`]) that let callers react to paid orders, failed payments and
//!    reconciliation anomalies without blocking the reconciler.
mod ccg_api;

pub mod db_types;
pub mod events;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use ccg_api::{
    cart_api::CartApi,
    checkout_api::CheckoutApi,
    errors::{CartApiError, CheckoutError, PaymentFlowError},
    payment_flow_api::{PaymentFlowApi, DEFAULT_CLAIM_TIMEOUT_SECS, DEFAULT_SHOP_NAME},
    payment_objects,
    reconciliation_api::ReconciliationApi,
    transitions,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
