use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::{GatewayError, LedgerError},
};

#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Product {0} does not exist or is not available")]
    ProductNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for CartApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ProductNotFound(id) => Self::ProductNotFound(id),
            e @ (LedgerError::QuantityLimitExceeded(..) | LedgerError::AmountOverflow(_)) => {
                Self::Validation(e.to_string())
            },
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for CheckoutError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EmptyCart => Self::EmptyCart,
            LedgerError::OrderNotFound(id) => Self::OrderNotFound(id),
            e @ LedgerError::AmountOverflow(_) => Self::Validation(e.to_string()),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Order {0} has already been processed. Its status is {1}")]
    OrderAlreadyProcessed(OrderId, OrderStatusType),
    #[error("Order {0} already has a payment in progress")]
    PaymentInProgress(OrderId),
    #[error("Crypto payments are not available at the moment. {0}")]
    GatewayUnavailable(String),
    #[error("The payment provider could not be reached. Please try again. {0}")]
    GatewayTransient(String),
    #[error("The payment provider rejected the request. {0}")]
    GatewayRejected(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for PaymentFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderNotFound(id) => Self::NotFound(format!("Order {id}")),
            LedgerError::PaymentNotFound(s) => Self::NotFound(format!("Payment {s}")),
            LedgerError::OrderNotPending(id, status) => Self::OrderAlreadyProcessed(id, status),
            LedgerError::ActivePaymentExists(id) => Self::PaymentInProgress(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<GatewayError> for PaymentFlowError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(s) => Self::GatewayUnavailable(s),
            GatewayError::Transient(s) | GatewayError::InvalidResponse(s) => Self::GatewayTransient(s),
            GatewayError::Rejected(s) => Self::GatewayRejected(s),
        }
    }
}
