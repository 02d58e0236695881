use thiserror::Error;

use crate::db_types::{OrderId, OrderStatusType};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist or is not available")]
    ProductNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Order {0} has already been processed. Its status is {1}")]
    OrderNotPending(OrderId, OrderStatusType),
    #[error("Order {0} already has a payment in progress")]
    ActivePaymentExists(OrderId),
    #[error("A payment with reference {0} already exists")]
    PaymentAlreadyExists(String),
    #[error("The requested payment does not exist: {0}")]
    PaymentNotFound(String),
    #[error("A cart line for product {0} cannot hold more than {1} units")]
    QuantityLimitExceeded(i64, i64),
    #[error("The amount is too large: {0}")]
    AmountOverflow(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// Failures reported by a [`crate::traits::PaymentGateway`].
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The provider is not configured or the credentials were refused. Retrying will not help.
    #[error("The payment gateway is not available. {0}")]
    Unavailable(String),
    /// Timeouts, connection failures and provider 5xx responses. Safe for the caller to retry.
    #[error("The payment gateway failed temporarily. {0}")]
    Transient(String),
    /// The provider refused the request itself.
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("The payment gateway sent a response that could not be understood. {0}")]
    InvalidResponse(String),
}
