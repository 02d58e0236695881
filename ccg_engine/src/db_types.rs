use std::{fmt::Display, str::FromStr};

pub use ccg_common::Cents;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------       Product        ---------------------------------------------------------
/// A row of the external product catalog. The engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Cents,
    pub active: bool,
}

//--------------------------------------         Cart         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub buyer_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       CartItem       ---------------------------------------------------------
/// A line in a cart. `unit_price` is captured when the product is first added, so later catalog price changes do not
/// affect it. `subtotal` is always `quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    #[sqlx(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Cents,
    pub subtotal: Cents,
}

//--------------------------------------   OrderStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and is waiting for payment.
    Pending,
    /// A payment for the order has been confirmed by the gateway.
    Paid,
    /// The order was marked as failed by an administrator.
    Failed,
    /// The order was cancelled by an administrator.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Failed => write!(f, "Failed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------       OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse::<i64>().map(Self).map_err(|e| ConversionError(format!("{s}: {e}")))
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
/// An immutable snapshot of a checkout. Only `status` (and `updated_at`) ever change after creation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: i64,
    pub total: Cents,
    pub currency: String,
    pub status: OrderStatusType,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub total: Cents,
    pub currency: String,
    pub shipping_address: Option<String>,
}

impl NewOrder {
    pub fn new(buyer_id: i64, total: Cents, currency: &str) -> Self {
        Self { buyer_id, total, currency: currency.to_string(), shipping_address: None }
    }

    pub fn with_shipping_address(mut self, address: Option<String>) -> Self {
        self.shipping_address = address;
        self
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Waiting for the gateway to report the outcome of the charge.
    Pending,
    /// Terminal. The charge was confirmed.
    Paid,
    /// Terminal. The charge failed or expired.
    Failed,
}

impl PaymentStatus {
    /// Terminal states are final. No gateway event may move a payment out of one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Crypto,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Crypto => write!(f, "Crypto"),
        }
    }
}

//--------------------------------------       Payment        ---------------------------------------------------------
/// One attempt to collect the total of an order through the gateway.
///
/// `reference` holds the gateway charge id. It is `None` only for the brief window between claiming the order and the
/// gateway confirming that the charge exists.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Cents,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    ProcessedEvent    ---------------------------------------------------------
/// Write-once marker for a gateway event that has been applied.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub reference: Option<String>,
    pub outcome: String,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------     AnomalyKind      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// The event's charge id matches no payment.
    UnknownReference,
    /// The event would move a payment out of a terminal state.
    RegressionAttempt,
    /// The payment was confirmed but its order is no longer pending.
    OrderNotPending,
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::UnknownReference => write!(f, "UnknownReference"),
            AnomalyKind::RegressionAttempt => write!(f, "RegressionAttempt"),
            AnomalyKind::OrderNotPending => write!(f, "OrderNotPending"),
        }
    }
}

//-------------------------------------- ReconciliationAnomaly ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ReconciliationAnomaly {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub reference: Option<String>,
    pub kind: AnomalyKind,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}
