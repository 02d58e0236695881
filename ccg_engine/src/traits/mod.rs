//! Behaviour a backend must provide to act as the ledger for the checkout engine, and the abstraction over the
//! external payment provider.
mod cart_management;
mod checkout_management;
mod data_objects;
mod errors;
mod payment_gateway;
mod payment_ledger;
mod product_catalog;

pub use cart_management::{CartManagement, MAX_LINE_QUANTITY};
pub use checkout_management::CheckoutManagement;
pub use data_objects::{
    ChargeHandle,
    ChargeRequest,
    ChargeSummary,
    GatewayEvent,
    GatewayEventKind,
    ReconcileOutcome,
    RemoteCharge,
    RemoteStatus,
};
pub use errors::{GatewayError, LedgerError};
pub use payment_gateway::PaymentGateway;
pub use payment_ledger::PaymentLedger;
pub use product_catalog::ProductCatalog;
