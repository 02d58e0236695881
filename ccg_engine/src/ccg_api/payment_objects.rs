use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ccg_api::errors::CartApiError,
    db_types::{CartItem, Cents, Order, OrderId, OrderStatusType, Payment, PaymentStatus},
    traits::{ChargeHandle, RemoteCharge},
};

/// The currencies a buyer may pay a hosted charge with.
pub const ACCEPTED_CURRENCIES: [&str; 6] =
    ["Bitcoin (BTC)", "Ethereum (ETH)", "USD Coin (USDC)", "Tether (USDT)", "DAI", "Dogecoin (DOGE)"];

/// The contents of a buyer's cart. `total` is the sum of the stored line subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub buyer_id: i64,
    pub items: Vec<CartItem>,
    pub total: Cents,
}

impl CartSnapshot {
    /// Fails if the line subtotals cannot be added up without overflowing.
    pub fn new(buyer_id: i64, items: Vec<CartItem>) -> Result<Self, CartApiError> {
        let total = Cents::checked_sum(items.iter().map(|i| i.subtotal))
            .ok_or_else(|| CartApiError::Validation("The cart total is too large".to_string()))?;
        Ok(Self { buyer_id, items, total })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Everything the buyer needs to complete a hosted crypto payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order_id: OrderId,
    pub payment_id: i64,
    pub charge_id: String,
    pub code: String,
    pub payment_url: String,
    pub amount: Cents,
    pub currency: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub addresses: BTreeMap<String, String>,
    pub accepted_currencies: Vec<String>,
}

impl PaymentIntent {
    pub fn new(order: &Order, payment: &Payment, charge: ChargeHandle) -> Self {
        Self {
            order_id: order.id,
            payment_id: payment.id,
            charge_id: charge.charge_id,
            code: charge.code,
            payment_url: charge.hosted_url,
            amount: payment.amount,
            currency: order.currency.clone(),
            expires_at: charge.expires_at,
            addresses: charge.addresses,
            accepted_currencies: ACCEPTED_CURRENCIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The provider's live view of a charge next to the locally persisted payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub charge_id: String,
    pub remote_status: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub remote_payments: Vec<Value>,
    pub order_id: OrderId,
    pub order_status: OrderStatusType,
    pub local_status: PaymentStatus,
    pub amount: Cents,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentStatusReport {
    pub fn new(remote: RemoteCharge, payment: &Payment, order: &Order) -> Self {
        Self {
            charge_id: remote.charge_id,
            remote_status: remote.status.to_string(),
            confirmed_at: remote.confirmed_at,
            expires_at: remote.expires_at,
            remote_payments: remote.payments,
            order_id: order.id,
            order_status: order.status,
            local_status: payment.status,
            amount: payment.amount,
            paid_at: payment.paid_at,
        }
    }
}

/// One charge as reported by the provider, with the matching local payment if there is one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeListing {
    pub charge_id: String,
    pub charge: Value,
    pub payment: Option<Payment>,
}
