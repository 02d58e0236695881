//! # Checkout engine public API
//!
//! The `ccg_api` module exposes the programmatic API for the checkout engine. Each API is a thin, generic layer over
//! a backend that implements the traits it needs, so the pieces can be picked and combined independently.
//!
//! * [`cart_api`] manages the buyer's open cart.
//! * [`checkout_api`] converts a cart into an order and reads orders back.
//! * [`payment_flow_api`] claims an order for payment and creates the charge with the payment gateway.
//! * [`reconciliation_api`] applies verified gateway events to the ledger and notifies subscribers.
//! * [`transitions`] is the pure payment state machine the ledger applies.
//!
//! # API usage
//!
//! ```rust,ignore
//! use ccg_engine::{CartApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/ccg_store.db", 5).await?;
//! let api = CartApi::new(db);
//! let cart = api.add_item(buyer_id, product_id, 2).await?;
//! println!("Cart total: {}", cart.total);
//! ```

pub mod cart_api;
pub mod checkout_api;
pub mod errors;
pub mod payment_flow_api;
pub mod payment_objects;
pub mod reconciliation_api;
pub mod transitions;
